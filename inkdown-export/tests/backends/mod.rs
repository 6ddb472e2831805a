//! Backend output tests.

mod docx;
