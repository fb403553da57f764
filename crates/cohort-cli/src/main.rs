//! Cohort CLI
//!
//! The `cohort` command evaluates cohort definitions stored in a JSON file
//! against a JSON subject table.
//!
//! ## Commands
//!
//! - `list`: Show the definitions in a file
//! - `evaluate`: Evaluate one definition and print its member ids

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use cohort_core::{
    register_builtins, BuiltinDefinition, Cohort, CohortEngine, EngineConfig, EvaluationContext,
    MemoryDefinitionStore, MemorySubjectSource, SubjectId,
};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(name = "cohort")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate parameterized cohort definitions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Compute every definition directly, bypassing the evaluation cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the definitions in a file
    List {
        /// JSON array of definitions
        #[arg(short, long, env = "COHORT_DEFINITIONS")]
        definitions: PathBuf,
    },

    /// Evaluate a named definition
    Evaluate {
        /// JSON array of definitions
        #[arg(short, long, env = "COHORT_DEFINITIONS")]
        definitions: PathBuf,

        /// JSON array of subjects
        #[arg(short, long, env = "COHORT_SUBJECTS")]
        subjects: PathBuf,

        /// Name of the definition to evaluate
        #[arg(short, long)]
        name: String,

        /// Parameter value as NAME=VALUE; VALUE is read as JSON, else as text
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,

        /// Restrict the result to the members of this definition
        #[arg(short, long)]
        base: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct DefinitionSummary {
    name: String,
    #[serde(rename = "type")]
    definition_type: &'static str,
    parameters: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EvaluationOutput {
    definition: String,
    size: usize,
    members: Vec<SubjectId>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    cohort_core::init_tracing(cli.json, level);

    let mut config = EngineConfig::from_env();
    if cli.no_cache {
        config.caching = false;
    }

    match cli.command {
        Commands::List { definitions } => {
            let summaries = cmd_list(&definitions)?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            Ok(())
        }
        Commands::Evaluate {
            definitions,
            subjects,
            name,
            params,
            base,
        } => {
            let output = cmd_evaluate(
                config,
                &definitions,
                &subjects,
                &name,
                params,
                base.as_deref(),
            )?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

/// Parse `NAME=VALUE`. VALUE is taken as JSON when it parses, else as a string.
fn parse_param(raw: &str) -> std::result::Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn load_definitions(path: &Path) -> Result<Vec<BuiltinDefinition>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open definitions file {}", path.display()))?;
    let definitions: Vec<BuiltinDefinition> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse definitions file {}", path.display()))?;
    debug!(path = %path.display(), count = definitions.len(), "loaded definitions");
    Ok(definitions)
}

fn load_subjects(path: &Path) -> Result<MemorySubjectSource> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open subjects file {}", path.display()))?;
    let source = MemorySubjectSource::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse subjects file {}", path.display()))?;
    debug!(path = %path.display(), count = source.len(), "loaded subjects");
    Ok(source)
}

fn find_definition<'a>(
    definitions: &'a [BuiltinDefinition],
    name: &str,
) -> Result<&'a BuiltinDefinition> {
    definitions
        .iter()
        .find(|d| d.as_definition().name() == name)
        .ok_or_else(|| anyhow!("No definition named '{name}'"))
}

fn cmd_list(definitions: &Path) -> Result<Vec<DefinitionSummary>> {
    let definitions = load_definitions(definitions)?;
    Ok(definitions
        .iter()
        .map(|d| {
            let d = d.as_definition();
            DefinitionSummary {
                name: d.name().to_string(),
                definition_type: d.definition_type().name,
                parameters: d.parameters().iter().map(|p| p.name.clone()).collect(),
            }
        })
        .collect())
}

fn cmd_evaluate(
    config: EngineConfig,
    definitions: &Path,
    subjects: &Path,
    name: &str,
    params: Vec<(String, Value)>,
    base: Option<&str>,
) -> Result<EvaluationOutput> {
    let definitions = load_definitions(definitions)?;
    let source = Arc::new(load_subjects(subjects)?);

    let mut builder = CohortEngine::builder().with_config(config);
    register_builtins(&mut builder, source, Arc::new(MemoryDefinitionStore::new()))?;
    let engine = builder.build();

    let mut context = EvaluationContext::new();
    for (param, value) in params {
        context.set_parameter(param, value);
    }

    if let Some(base_name) = base {
        let base_definition = find_definition(&definitions, base_name)?;
        let base_cohort = engine
            .evaluate(base_definition.as_definition(), &context)
            .with_context(|| format!("Failed to evaluate base definition '{base_name}'"))?;
        info!(base = %base_name, size = base_cohort.len(), "base cohort ready");
        context.set_base_cohort(Some(base_cohort));
    }

    let definition = find_definition(&definitions, name)?;
    let cohort: Cohort = engine
        .evaluate(definition.as_definition(), &context)
        .with_context(|| format!("Failed to evaluate definition '{name}'"))?;

    Ok(EvaluationOutput {
        definition: name.to_string(),
        size: cohort.len(),
        members: cohort.iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
        let definitions = dir.join("definitions.json");
        let subjects = dir.join("subjects.json");
        let definition_json = json!([
            {
                "type": "characteristic",
                "header": {
                    "name": "By gender",
                    "parameters": [{ "name": "gender", "type": "text", "default_value": "F" }]
                },
                "effective_date": "2024-06-01"
            },
            {
                "type": "characteristic",
                "header": { "name": "Seniors" },
                "min_age": 65,
                "effective_date": "2024-06-01"
            },
            { "type": "static", "header": { "name": "Pilot" }, "members": [1, 2, 3] }
        ]);
        let subject_json = json!([
            { "id": 1, "gender": "F", "birthdate": "1950-03-01" },
            { "id": 2, "gender": "M", "birthdate": "1990-07-20" },
            { "id": 3, "gender": "F", "birthdate": "2010-01-01" },
            { "id": 4, "gender": "M", "birthdate": "1940-12-24" }
        ]);
        std::fs::write(&definitions, definition_json.to_string()).unwrap();
        std::fs::write(&subjects, subject_json.to_string()).unwrap();
        (definitions, subjects)
    }

    fn member_ids(output: &EvaluationOutput) -> Vec<u64> {
        output.members.iter().map(|id| id.0).collect()
    }

    #[test]
    fn test_parse_param_reads_json_then_text() {
        assert_eq!(parse_param("min_age=65").unwrap(), ("min_age".to_string(), json!(65)));
        assert_eq!(
            parse_param("members=[1,2]").unwrap(),
            ("members".to_string(), json!([1, 2]))
        );
        assert_eq!(parse_param("gender=F").unwrap(), ("gender".to_string(), json!("F")));
        assert_eq!(parse_param("note=a=b").unwrap(), ("note".to_string(), json!("a=b")));
        assert!(parse_param("gender").is_err());
        assert!(parse_param("=F").is_err());
    }

    #[test]
    fn test_cli_parses_repeated_params() {
        let cli = Cli::try_parse_from([
            "cohort", "--no-cache", "evaluate", "-d", "defs.json", "-s", "subjects.json", "-n",
            "By gender", "-p", "gender=M", "-p", "min_age=18",
        ])
        .unwrap();
        assert!(cli.no_cache);
        match cli.command {
            Commands::Evaluate { params, base, .. } => {
                assert_eq!(params.len(), 2);
                assert_eq!(params[1], ("min_age".to_string(), json!(18)));
                assert!(base.is_none());
            }
            _ => panic!("Expected evaluate command"),
        }
    }

    #[test]
    fn test_cmd_list_summarizes_definitions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (definitions, _) = write_fixtures(temp_dir.path());

        let summaries = cmd_list(&definitions).unwrap();
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["By gender", "Seniors", "Pilot"]);
        assert_eq!(summaries[0].definition_type, "characteristic");
        assert_eq!(summaries[0].parameters, vec!["gender".to_string()]);
        assert_eq!(summaries[2].definition_type, "static");
    }

    #[test]
    fn test_cmd_evaluate_uses_defaults_and_params() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (definitions, subjects) = write_fixtures(temp_dir.path());

        let output = cmd_evaluate(
            EngineConfig::default(),
            &definitions,
            &subjects,
            "By gender",
            Vec::new(),
            None,
        )
        .unwrap();
        assert_eq!(member_ids(&output), vec![1, 3]);
        assert_eq!(output.size, 2);

        let output = cmd_evaluate(
            EngineConfig { caching: false },
            &definitions,
            &subjects,
            "By gender",
            vec![("gender".to_string(), json!("M"))],
            None,
        )
        .unwrap();
        assert_eq!(member_ids(&output), vec![2, 4]);
    }

    #[test]
    fn test_cmd_evaluate_restricts_to_base() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (definitions, subjects) = write_fixtures(temp_dir.path());

        let output = cmd_evaluate(
            EngineConfig::default(),
            &definitions,
            &subjects,
            "Seniors",
            Vec::new(),
            Some("Pilot"),
        )
        .unwrap();
        assert_eq!(member_ids(&output), vec![1]);
    }

    #[test]
    fn test_cmd_evaluate_unknown_name_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (definitions, subjects) = write_fixtures(temp_dir.path());

        let err = cmd_evaluate(
            EngineConfig::default(),
            &definitions,
            &subjects,
            "Missing",
            Vec::new(),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("No definition named 'Missing'"));
    }
}
