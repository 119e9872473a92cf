use colored::Colorize;

use crate::database::DocumentStore;
use crate::document::Document;

pub fn list_documents(store: &DocumentStore) -> Result<(), String> {
    if store.is_empty() {
        println!("No documents indexed. Put PDFs in the PDF directory and restart with --reindex.");
        return Ok(());
    }

    println!("📚 {} indexed documents:", store.len());
    for (i, doc) in store.documents().iter().enumerate() {
        println!("{:>3}. {}", i + 1, doc.to_string().bright_yellow());
    }
    Ok(())
}

pub fn show_document(store: &DocumentStore, name: &str) -> Result<(), String> {
    let doc = store
        .get_by_name(name)
        .ok_or_else(|| format!("No document named {:?}", name))?;
    print_document(doc);
    Ok(())
}

fn print_document(doc: &Document) {
    println!("\n📄 {}", doc.name.bright_yellow());
    println!("Path: {}", doc.path);
    println!("Size: {} bytes", doc.size.to_string().bright_green());
    println!("Category: {}", doc.category.trim().bright_cyan());
    println!("Subcategory: {}", doc.subcategory.trim().bright_cyan());
    println!("Observation: {}", doc.observation.trim());

    match &doc.locador {
        Some(l) => println!("Landlord: {} (CNPJ {}, RG {})", l.name.bright_green(), l.cnpj, l.rg),
        None => println!("Landlord: {}", "not found".dimmed()),
    }
    match &doc.locatario {
        Some(t) => println!("Tenant: {} (RG {})", t.name.bright_green(), t.rg),
        None => println!("Tenant: {}", "not found".dimmed()),
    }
}
