mod model;
mod parties;
mod scanner;

pub use model::{truncate_chars, Document, Landlord, RawDocument, Tenant};
pub use parties::{extract_landlord, extract_tenant};
pub use scanner::{normalize_whitespace, scan_pdfs, ScanError};
