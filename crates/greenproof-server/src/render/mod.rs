//! Report renderers shipped with the service.

pub mod pdf;

pub use pdf::PdfReportRenderer;
