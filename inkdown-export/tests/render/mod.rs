//! Render service contract: URL scheme, retry schedule, failure modes.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use inkdown_export::render::{DiagramRenderer, RetryPolicy};
use inkdown_export::ExportError;
use std::time::Duration;

use crate::common::{drain, png_with_dimensions, scripted_server, ScriptedResponse};

fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        attempts: 3,
        initial_delay: Duration::from_millis(5),
    }
}

#[test]
fn fetches_the_encoded_diagram_from_the_service() {
    let png = png_with_dimensions(64, 64);
    let (base, requests) = scripted_server(vec![ScriptedResponse::bytes(png.clone())]);

    let source = "graph TD;\n  A-->B;";
    let renderer = DiagramRenderer::remote(&base, quick_policy());
    assert_eq!(renderer.render(source).expect("render"), png);

    let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(request.method, "GET");
    let encoded = request.path.strip_prefix("/img/").expect("path shape");
    assert_eq!(URL_SAFE.decode(encoded).unwrap(), source.as_bytes());
}

#[test]
fn retries_through_transient_failures() {
    let png = png_with_dimensions(32, 32);
    let (base, requests) = scripted_server(vec![
        ScriptedResponse::status(503),
        ScriptedResponse::status(503),
        ScriptedResponse::bytes(png.clone()),
    ]);

    let renderer = DiagramRenderer::remote(&base, quick_policy());
    assert_eq!(renderer.render("graph LR;").expect("render"), png);
    assert_eq!(drain(&requests).len(), 3);
}

#[test]
fn gives_up_when_attempts_are_exhausted() {
    let (base, requests) = scripted_server(vec![
        ScriptedResponse::status(503),
        ScriptedResponse::status(503),
        ScriptedResponse::status(503),
    ]);

    let renderer = DiagramRenderer::remote(&base, quick_policy());
    match renderer.render("graph LR;").expect_err("must fail") {
        ExportError::DiagramRender(msg) => assert!(msg.contains("503"), "got: {msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(drain(&requests).len(), 3);
}

#[test]
fn non_retryable_status_fails_immediately() {
    let (base, requests) = scripted_server(vec![ScriptedResponse::status(404)]);

    let renderer = DiagramRenderer::remote(&base, quick_policy());
    renderer.render("graph LR;").expect_err("must fail");
    assert_eq!(drain(&requests).len(), 1);
}

#[cfg(all(unix, feature = "native-render"))]
mod unix {
    use super::quick_policy;
    use inkdown_export::render::{DiagramRenderer, TOOL_BIN_ENV};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn write_stub_mmdc() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let script_path = dir.path().join("fake-mmdc.sh");
        let script = r#"#!/bin/sh
OUTPUT=""
PREV=""
for arg in "$@"; do
  if [ "$PREV" = "-o" ]; then
    OUTPUT="$arg"
  fi
  PREV="$arg"
done
if [ -z "$OUTPUT" ]; then
  echo "missing output" >&2
  exit 1
fi
printf 'PNGBYTES' > "$OUTPUT"
exit 0
"#;
        fs::write(&script_path, script).unwrap();
        let mut perms = fs::metadata(&script_path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script_path, perms).unwrap();
        (dir, script_path)
    }

    #[test]
    fn local_tool_renders_through_temp_files() {
        let (_dir, stub) = write_stub_mmdc();
        let prev = std::env::var(TOOL_BIN_ENV).ok();
        std::env::set_var(TOOL_BIN_ENV, &stub);

        let renderer =
            DiagramRenderer::with_local_tool("mmdc", "http://127.0.0.1:9", quick_policy());
        assert!(renderer.uses_local_tool());
        let bytes = renderer.render("graph TD;").expect("render");
        assert_eq!(bytes, b"PNGBYTES");

        if let Some(prev) = prev {
            std::env::set_var(TOOL_BIN_ENV, prev);
        } else {
            std::env::remove_var(TOOL_BIN_ENV);
        }
    }
}
