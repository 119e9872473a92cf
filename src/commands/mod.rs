use colored::Colorize;

use crate::database::DocumentStore;
use crate::llm::{QueryPipeline, QueryResult};

mod document;

pub struct CommandHandler {
    pipeline: QueryPipeline,
    store: DocumentStore,
}

impl CommandHandler {
    pub fn new(pipeline: QueryPipeline, store: DocumentStore) -> Self {
        Self { pipeline, store }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Runs one line of input. Anything that is not a known command is
    /// treated as a question.
    pub async fn handle_command(&mut self, input: &str) -> Result<(), String> {
        let input = input.trim();
        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command {
            "" => Ok(()),
            "help" => {
                print_help();
                Ok(())
            }
            "list" => document::list_documents(&self.store),
            "show" if rest.is_empty() => Err("Usage: show <file name>".to_string()),
            "show" => document::show_document(&self.store, rest),
            "ask" if rest.is_empty() => Err("Usage: ask <question>".to_string()),
            "ask" => self.ask(rest).await,
            _ => self.ask(input).await,
        }
    }

    async fn ask(&self, question: &str) -> Result<(), String> {
        if self.store.is_empty() {
            return Err("No documents indexed yet.".to_string());
        }

        println!("🔍 {}", question.bright_yellow());
        let result = self
            .pipeline
            .process_query(&self.store, question)
            .await
            .map_err(|e| format!("Failed to answer: {}", e))?;

        print_result(&result);
        Ok(())
    }
}

fn print_help() {
    println!("📚 Commands:");
    println!("  <question>         - Ask about the indexed contracts");
    println!("  ask <question>     - Same as above");
    println!("  list               - List indexed documents");
    println!("  show <file name>   - Show a document's classification and parties");
    println!("  help               - Show this menu");
    println!("  exit               - Quit");
}

fn print_result(result: &QueryResult) {
    println!("\n💬 {}", result.answer.trim().bright_green());
    if !result.documents.is_empty() {
        println!("\n📄 Sources:");
        for doc in &result.documents {
            let tenant = doc
                .locatario
                .as_ref()
                .map(|t| format!(" (tenant: {})", t.name))
                .unwrap_or_default();
            println!("  • {}{}", doc.name.bright_yellow(), tenant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Oracle;
    use crate::providers::testing::ScriptedProvider;
    use std::sync::Arc;

    fn handler(dir: &tempfile::TempDir) -> CommandHandler {
        let oracle = Oracle::new(Arc::new(ScriptedProvider::new()));
        CommandHandler::new(QueryPipeline::new(oracle), DocumentStore::new(dir.path().join("documents.json")))
    }

    #[tokio::test]
    async fn empty_store_refuses_questions() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(&dir);

        assert!(handler.handle_command("Qual o valor do aluguel?").await.is_err());
        assert!(handler.handle_command("list").await.is_ok());
        assert!(handler.handle_command("").await.is_ok());
    }

    #[tokio::test]
    async fn show_requires_known_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(&dir);

        assert_eq!(handler.handle_command("show").await, Err("Usage: show <file name>".to_string()));
        assert!(handler.handle_command("show nada.pdf").await.is_err());
    }
}
