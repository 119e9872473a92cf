//! Best-effort extraction of the contracting parties from contract text.
//!
//! Both patterns run over whitespace-normalized text and are greedy, so when a
//! contract mentions several `RG nº` values the last one is captured.

use lazy_static::lazy_static;
use regex::Regex;

use super::model::{Landlord, Tenant};

lazy_static! {
    static ref LANDLORD_PATTERN: Regex = Regex::new(
        r"(?i)LOCADOR:\s*([^,]+),\s*pessoa\s*jurídica.*CNPJ\s*sob\s*o\s*nº\s*([\d./-]+).*RG\s*nº\s*([\d.-]+)"
    )
    .unwrap();
    static ref TENANT_PATTERN: Regex =
        Regex::new(r"(?i)LOCATÁRIO:\s*([^,]+).*RG\s*nº\s*([\d.-]+)").unwrap();
}

pub fn extract_landlord(text: &str) -> Option<Landlord> {
    let caps = LANDLORD_PATTERN.captures(text)?;
    Some(Landlord {
        name: caps[1].trim().to_string(),
        cnpj: caps[2].to_string(),
        rg: caps[3].to_string(),
    })
}

pub fn extract_tenant(text: &str) -> Option<Tenant> {
    let caps = TENANT_PATTERN.captures(text)?;
    Some(Tenant {
        name: caps[1].trim().to_string(),
        rg: caps[2].to_string(),
    })
}
