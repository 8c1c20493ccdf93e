use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{IndexDescription, OutputFormat};
use crate::services::{IngestPlan, IngestReport};

/// Last line printed by a successful ingestion.
pub const READY_MESSAGE: &str = "Pinecone vectorstore ready.";

pub trait Formatter {
    fn format_ingest_report(&self, report: &IngestReport) -> String;
    fn format_plan(&self, plan: &IngestPlan) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_paths(&self, paths: &PathInfo) -> String;
    fn format_message(&self, message: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: Option<String>,
    pub config_exists: bool,
    pub data_dir: String,
    pub pinecone_key_present: bool,
    pub gateway_key_present: bool,
    pub gateway_url: String,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub index_name: String,
    pub index: Option<IndexDescription>,
    pub pinecone_error: Option<String>,
}

/// Where configuration is read from.
#[derive(Debug, Clone, Serialize)]
pub struct PathInfo {
    pub config_path: String,
    pub config_exists: bool,
    pub env_path: Option<String>,
    pub env_exists: bool,
}

fn present(flag: bool) -> &'static str {
    if flag { "[SET]" } else { "[MISSING]" }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_ingest_report(&self, report: &IngestReport) -> String {
        // Dimension check lines are printed as soon as the check runs.
        let mut output = String::new();
        writeln!(output).unwrap();
        writeln!(output, "Ingestion Complete").unwrap();
        writeln!(output, "------------------").unwrap();
        writeln!(output, "Files loaded:     {}", report.files).unwrap();
        writeln!(output, "Pages read:       {}", report.pages).unwrap();
        writeln!(output, "Documents kept:   {}", report.documents).unwrap();
        writeln!(output, "Chunks created:   {}", report.chunks).unwrap();
        writeln!(output, "Vectors upserted: {}", report.vectors_upserted).unwrap();
        writeln!(
            output,
            "Index:            {} ({}, dim {})",
            report.index_name, report.provision, report.index_dimension
        )
        .unwrap();
        writeln!(output, "Duration:         {}ms", report.duration_ms).unwrap();
        writeln!(output).unwrap();
        writeln!(output, "{}", READY_MESSAGE).unwrap();
        output
    }

    fn format_plan(&self, plan: &IngestPlan) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "Dry run: would ingest {} files from {}",
            plan.files.len(),
            plan.data_dir.display()
        )
        .unwrap();
        for file in &plan.files {
            writeln!(output, "  {}", file.display()).unwrap();
        }
        writeln!(output, "Pages:     {} ({} blank)", plan.pages, plan.blank_pages).unwrap();
        writeln!(output, "Documents: {}", plan.documents).unwrap();
        writeln!(output, "Chunks:    {}", plan.chunks).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        match status.config_path {
            Some(ref path) if status.config_exists => {
                writeln!(output, "Config:        {}", path).unwrap()
            }
            Some(ref path) => writeln!(output, "Config:        {} (defaults)", path).unwrap(),
            None => writeln!(output, "Config:        (defaults)").unwrap(),
        }
        writeln!(output, "Data dir:      {}", status.data_dir).unwrap();
        writeln!(output).unwrap();

        writeln!(
            output,
            "PINECONE_API_KEY: {}",
            present(status.pinecone_key_present)
        )
        .unwrap();
        writeln!(
            output,
            "OPENAI_API_KEY:   {}",
            present(status.gateway_key_present)
        )
        .unwrap();
        writeln!(output, "Gateway:          {}", status.gateway_url).unwrap();
        writeln!(output).unwrap();

        writeln!(
            output,
            "Embedding:     {} ({})",
            status.embedding_model, status.embedding_provider
        )
        .unwrap();

        match (&status.index, &status.pinecone_error) {
            (Some(index), _) => {
                let ready = if index.ready { "[READY]" } else { "[PENDING]" };
                writeln!(output, "Index:         {} {}", index.name, ready).unwrap();
                writeln!(output, "  Dimension:   {}", index.dimension).unwrap();
                writeln!(output, "  Metric:      {}", index.metric).unwrap();
                writeln!(output, "  Host:        {}", index.host).unwrap();
            }
            (None, Some(error)) => {
                writeln!(output, "Index:         {} [UNKNOWN]", status.index_name).unwrap();
                writeln!(output, "  Error:       {}", error).unwrap();
            }
            (None, None) => {
                writeln!(output, "Index:         {} [ABSENT]", status.index_name).unwrap();
            }
        }

        output
    }

    fn format_paths(&self, paths: &PathInfo) -> String {
        let state = |exists: bool| if exists { "active" } else { "would be" };
        let mut output = String::new();
        writeln!(
            output,
            "Config ({}): {}",
            state(paths.config_exists),
            paths.config_path
        )
        .unwrap();
        if let Some(ref env_path) = paths.env_path {
            writeln!(output, ".env file ({}): {}", state(paths.env_exists), env_path).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut output = rendered
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string());
        output.push('\n');
        output
    }
}

impl Formatter for JsonFormatter {
    fn format_ingest_report(&self, report: &IngestReport) -> String {
        self.render(&serde_json::json!({
            "report": report,
            "messages": report.dimension_check.messages(),
            "message": READY_MESSAGE,
        }))
    }

    fn format_plan(&self, plan: &IngestPlan) -> String {
        self.render(&serde_json::json!({ "dry_run": true, "plan": plan }))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(status)
    }

    fn format_paths(&self, paths: &PathInfo) -> String {
        self.render(paths)
    }

    fn format_message(&self, message: &str) -> String {
        self.render(&serde_json::json!({ "message": message }))
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metric;
    use crate::services::{DimensionCheck, ProvisionOutcome};

    fn report(dimension_check: DimensionCheck) -> IngestReport {
        IngestReport {
            files: 1,
            pages: 3,
            documents: 3,
            chunks: 7,
            vectors_upserted: 7,
            batches: 1,
            dimension_check,
            index_name: "medical-chatbot".to_string(),
            index_dimension: 384,
            provision: ProvisionOutcome::Created,
            duration_ms: 12,
        }
    }

    fn status(index: Option<IndexDescription>, error: Option<String>) -> StatusInfo {
        StatusInfo {
            config_path: Some("/home/u/.config/pdfingest/config.toml".to_string()),
            config_exists: false,
            data_dir: "data/".to_string(),
            pinecone_key_present: true,
            gateway_key_present: false,
            gateway_url: "https://openrouter.ai/api/v1".to_string(),
            embedding_provider: "local".to_string(),
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            index_name: "medical-chatbot".to_string(),
            index,
            pinecone_error: error,
        }
    }

    #[test]
    fn test_text_report_ends_ready() {
        let text = TextFormatter.format_ingest_report(&report(DimensionCheck::Match(384)));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.last(), Some(&READY_MESSAGE));
        assert!(!text.contains("Embedding dimension detected"));
        assert!(text.contains("Chunks created:   7"));
        assert!(text.contains("medical-chatbot (created, dim 384)"));
    }

    #[test]
    fn test_json_report_keeps_mismatch_warning() {
        let json = JsonFormatter::new(true).format_ingest_report(&report(DimensionCheck::Mismatch {
            detected: 768,
            expected: 384,
        }));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["messages"][0], "Embedding dimension detected: 768");
        assert_eq!(
            value["messages"][1],
            "Warning: embedding dimension != 384. Adjust Pinecone index dimension accordingly."
        );
        assert!(json.ends_with("}\n"));
    }

    #[test]
    fn test_json_report() {
        let json = JsonFormatter::new(false)
            .format_ingest_report(&report(DimensionCheck::Failed("timeout".to_string())));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["report"]["chunks"], 7);
        assert_eq!(value["report"]["provision"], "created");
        assert_eq!(value["report"]["dimension_check"]["failed"], "timeout");
        assert_eq!(value["message"], READY_MESSAGE);
    }

    #[test]
    fn test_text_status_variants() {
        let absent = TextFormatter.format_status(&status(None, None));
        assert!(absent.contains("[ABSENT]"));
        assert!(absent.contains("OPENAI_API_KEY:   [MISSING]"));
        assert!(absent.contains("(defaults)"));

        let index = IndexDescription {
            name: "medical-chatbot".to_string(),
            dimension: 384,
            metric: Metric::Cosine,
            host: "medical-chatbot-abc.svc.pinecone.io".to_string(),
            ready: true,
        };
        let ready = TextFormatter.format_status(&status(Some(index), None));
        assert!(ready.contains("[READY]"));
        assert!(ready.contains("Dimension:   384"));

        let failed = TextFormatter.format_status(&status(None, Some("unauthorized".to_string())));
        assert!(failed.contains("[UNKNOWN]"));
        assert!(failed.contains("unauthorized"));
    }

    fn paths(env_exists: bool) -> PathInfo {
        PathInfo {
            config_path: "/home/u/.config/pdfingest/config.toml".to_string(),
            config_exists: true,
            env_path: Some("/work/.env".to_string()),
            env_exists,
        }
    }

    #[test]
    fn test_json_message_is_one_line() {
        let formatter = JsonFormatter::new(false);
        assert_eq!(formatter.format_message("hi"), "{\"message\":\"hi\"}\n");
    }

    #[test]
    fn test_json_paths_is_a_single_object() {
        let json = JsonFormatter::new(true).format_paths(&paths(false));
        let values: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&json)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["config_exists"], true);
        assert_eq!(values[0]["env_path"], "/work/.env");
    }

    #[test]
    fn test_text_paths() {
        let text = TextFormatter.format_paths(&paths(false));
        assert_eq!(
            text,
            "Config (active): /home/u/.config/pdfingest/config.toml\n\
             .env file (would be): /work/.env\n"
        );
    }
}
