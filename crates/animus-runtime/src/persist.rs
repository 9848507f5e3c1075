//! The persistence shim: named write rules applied between steps.
//!
//! Each rule pairs a sampler with a serializer. On every call the persister
//! asks each rule whether the step is a multiple of its stride and, if so,
//! writes one file whose name is built from the rule's stem and the step.
//!
//! | Key | Extension | Writes | Kwargs |
//! |-----|-----------|--------|--------|
//! | `to_csv` | `.csv` | tables | `sep` (default `,`) |
//! | `to_json` | `.json` | tables | `pretty` (default false) |
//! | `to_jsonl` | `.jsonl` | tables | |
//! | `write_edgelist` | `.edgelist` | graphs | `sep` (default space) |
//! | `write_dot` | `.dot` | graphs | |

use crate::config::{SamplerKind, SamplingConfig};
use crate::error::PersistError;
use crate::sampler::{AgentSampler, EnvironmentSampler, GraphSampler, Sample, Sampler, Table};
use crate::system::ManagementSystem;
use animus_core::types::{Kwargs, Value};
use petgraph::dot::{Config, Dot};
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// The writer a rule hands its sample to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serializer {
    ToCsv,
    ToJson,
    ToJsonl,
    WriteEdgelist,
    WriteDot,
}

impl Serializer {
    pub fn key(&self) -> &'static str {
        match self {
            Serializer::ToCsv => "to_csv",
            Serializer::ToJson => "to_json",
            Serializer::ToJsonl => "to_jsonl",
            Serializer::WriteEdgelist => "write_edgelist",
            Serializer::WriteDot => "write_dot",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Serializer::ToCsv => "csv",
            Serializer::ToJson => "json",
            Serializer::ToJsonl => "jsonl",
            Serializer::WriteEdgelist => "edgelist",
            Serializer::WriteDot => "dot",
        }
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, Serializer::ToCsv | Serializer::ToJson | Serializer::ToJsonl)
    }

    /// Render a sample to text.
    pub fn render(&self, sample: &Sample, kwargs: &Kwargs) -> Result<String, PersistError> {
        match (self, sample) {
            (Serializer::ToCsv, Sample::Table(t)) => Ok(to_csv(t, kwarg_str(kwargs, "sep").unwrap_or(","))),
            (Serializer::ToJson, Sample::Table(t)) => {
                to_json(t, kwargs.get("pretty").is_some_and(Value::is_truthy))
            }
            (Serializer::ToJsonl, Sample::Table(t)) => to_jsonl(t),
            (Serializer::WriteEdgelist, Sample::Graph(g)) => {
                Ok(write_edgelist(g, kwarg_str(kwargs, "sep").unwrap_or(" ")))
            }
            (Serializer::WriteDot, Sample::Graph(g)) => Ok(write_dot(g)),
            (serializer, sample) => Err(PersistError::Incompatible {
                serializer: serializer.key().to_string(),
                sample: match sample {
                    Sample::Table(_) => "tabular".into(),
                    Sample::Graph(_) => "graph".into(),
                },
            }),
        }
    }
}

impl fmt::Display for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Serializer {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to_csv" => Ok(Serializer::ToCsv),
            "to_json" => Ok(Serializer::ToJson),
            "to_jsonl" => Ok(Serializer::ToJsonl),
            "write_edgelist" => Ok(Serializer::WriteEdgelist),
            "write_dot" => Ok(Serializer::WriteDot),
            other => Err(PersistError::UnknownSerializer(other.to_string())),
        }
    }
}

fn kwarg_str<'a>(kwargs: &'a Kwargs, name: &str) -> Option<&'a str> {
    kwargs.get(name).and_then(Value::as_str)
}

fn csv_field(value: &str, sep: &str) -> String {
    if value.contains(sep) || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render a table as delimited text with a header row.
pub fn to_csv(table: &Table, sep: &str) -> String {
    let mut csv = String::new();
    let header: Vec<String> = table.columns.iter().map(|c| csv_field(c, sep)).collect();
    csv.push_str(&header.join(sep));
    csv.push('\n');
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|v| csv_field(&v.to_string(), sep)).collect();
        csv.push_str(&cells.join(sep));
        csv.push('\n');
    }
    csv
}

/// Render a table as a JSON array of records.
pub fn to_json(table: &Table, pretty: bool) -> Result<String, PersistError> {
    let records: Vec<_> = table.records().collect();
    Ok(if pretty {
        serde_json::to_string_pretty(&records)?
    } else {
        serde_json::to_string(&records)?
    })
}

/// Render a table as one JSON record per line.
pub fn to_jsonl(table: &Table) -> Result<String, PersistError> {
    let mut out = String::new();
    for record in table.records() {
        out.push_str(&serde_json::to_string(&record)?);
        out.push('\n');
    }
    Ok(out)
}

/// One `a b` line per edge, using node labels.
pub fn write_edgelist(graph: &UnGraph<String, ()>, sep: &str) -> String {
    let mut out = String::new();
    for edge in graph.edge_references() {
        out.push_str(&graph[edge.source()]);
        out.push_str(sep);
        out.push_str(&graph[edge.target()]);
        out.push('\n');
    }
    out
}

/// Graphviz rendering of the labelled graph.
pub fn write_dot(graph: &UnGraph<String, ()>) -> String {
    format!("{:?}", Dot::with_config(graph, &[Config::EdgeNoLabel]))
}

/// A file stem, a sampler and a serializer, fired every `stride` steps.
#[derive(Debug, Clone)]
pub struct WriteRule {
    stem: String,
    sampler: Sampler,
    stride: u64,
    serializer: Serializer,
    kwargs: Kwargs,
}

impl WriteRule {
    pub fn new(
        stem: impl Into<String>,
        sampler: impl Into<Sampler>,
        stride: u64,
        serializer: &str,
    ) -> Result<Self, PersistError> {
        let stem = stem.into();
        let sampler = sampler.into();
        let serializer: Serializer = serializer.parse()?;
        if stride == 0 {
            return Err(PersistError::InvalidStride(stem));
        }
        if serializer.is_tabular() != sampler.is_tabular() {
            return Err(PersistError::Incompatible {
                serializer: serializer.key().to_string(),
                sample: sampler.label().to_string(),
            });
        }
        Ok(Self {
            stem,
            sampler,
            stride,
            serializer,
            kwargs: Kwargs::new(),
        })
    }

    pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn serializer(&self) -> Serializer {
        self.serializer
    }

    pub fn is_due(&self, step: u64) -> bool {
        step % self.stride == 0
    }

    /// File name for `step`: the step replaces `{}` in the stem, or is
    /// appended as `_<step>`.
    pub fn file_name(&self, step: u64) -> String {
        let base = if self.stem.contains("{}") {
            self.stem.replacen("{}", &step.to_string(), 1)
        } else {
            format!("{}_{}", self.stem, step)
        };
        format!("{}.{}", base, self.serializer.extension())
    }

    /// Write this rule's sample for `step` into `dir`.
    pub fn write(&self, system: &ManagementSystem, step: u64, dir: &Path) -> Result<PathBuf, PersistError> {
        let sample = self.sampler.sample(system, step);
        let content = self.serializer.render(&sample, &self.kwargs)?;
        let path = dir.join(self.file_name(step));
        std::fs::write(&path, content)?;
        debug!(rule = %self.stem, path = %path.display(), "sample written");
        Ok(path)
    }
}

/// Owns the write rules and the directory they write into.
#[derive(Debug, Clone)]
pub struct Persister {
    output_dir: PathBuf,
    rules: Vec<WriteRule>,
}

impl Persister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            rules: Vec::new(),
        }
    }

    /// Build the rules of a sampling configuration, using the default
    /// sampler of each kind.
    pub fn from_config(config: &SamplingConfig) -> Result<Self, PersistError> {
        let mut persister = Self::new(config.output_dir.clone());
        for rule in &config.rules {
            let sampler = match rule.sampler {
                SamplerKind::Agent => Sampler::from(AgentSampler::new()),
                SamplerKind::Environment => Sampler::from(EnvironmentSampler::new()),
                SamplerKind::Graph => Sampler::from(GraphSampler::new()),
            };
            persister.add_rule(
                WriteRule::new(rule.stem.clone(), sampler, rule.stride, &rule.serializer)?
                    .with_kwargs(rule.kwargs.clone()),
            );
        }
        Ok(persister)
    }

    pub fn add_rule(&mut self, rule: WriteRule) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: WriteRule) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn rules(&self) -> &[WriteRule] {
        &self.rules
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every rule due at `step`. Returns the files written.
    pub fn persist(&self, system: &ManagementSystem, step: u64) -> Result<Vec<PathBuf>, PersistError> {
        let due: Vec<&WriteRule> = self.rules.iter().filter(|r| r.is_due(step)).collect();
        if due.is_empty() {
            return Ok(Vec::new());
        }
        std::fs::create_dir_all(&self.output_dir)?;
        let written = due
            .into_iter()
            .map(|rule| rule.write(system, step, &self.output_dir))
            .collect::<Result<Vec<_>, _>>()?;
        info!(step, files = written.len(), dir = %self.output_dir.display(), "persisted samples");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut table = Table::new(["name", "note"]);
        table.push(vec![Value::from("ant"), Value::from("says \"hi\", twice")]);
        table.push(vec![Value::from("bee"), Value::Null]);
        table
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let csv = to_csv(&table(), ",");
        assert_eq!(csv, "name,note\nant,\"says \"\"hi\"\", twice\"\nbee,\n");
        let semi = to_csv(&table(), ";");
        assert!(semi.starts_with("name;note\n"));
        assert!(semi.contains("ant;\"says \"\"hi\"\", twice\""));
    }

    #[test]
    fn jsonl_writes_one_record_per_line() {
        let out = to_jsonl(&table()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], r#"{"name":"bee","note":null}"#);
    }

    #[test]
    fn file_names_take_the_step() {
        let rule = WriteRule::new("agents_{}_raw", AgentSampler::new(), 5, "to_csv").unwrap();
        assert_eq!(rule.file_name(10), "agents_10_raw.csv");
        let rule = WriteRule::new("topology", GraphSampler::new(), 1, "write_dot").unwrap();
        assert_eq!(rule.file_name(3), "topology_3.dot");
    }

    #[test]
    fn rules_are_validated() {
        assert!(matches!(
            WriteRule::new("x", AgentSampler::new(), 1, "to_parquet"),
            Err(PersistError::UnknownSerializer(_))
        ));
        assert!(matches!(
            WriteRule::new("x", GraphSampler::new(), 1, "to_csv"),
            Err(PersistError::Incompatible { .. })
        ));
        assert!(matches!(
            WriteRule::new("x", AgentSampler::new(), 0, "to_csv"),
            Err(PersistError::InvalidStride(_))
        ));
    }

    #[test]
    fn dot_output_omits_edge_labels() {
        let mut graph = UnGraph::<String, ()>::new_undirected();
        let a = graph.add_node("a".into());
        let b = graph.add_node("b".into());
        graph.add_edge(a, b, ());
        let dot = write_dot(&graph);
        assert!(dot.starts_with("graph {"));
        assert!(dot.contains("0 -- 1"));
        assert_eq!(write_edgelist(&graph, " "), "a b\n");
    }
}
