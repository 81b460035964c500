//! Worker result documents and their conversion into findings.

use super::{GitEngine, LineCount, SourceLocator, Variant, Vulnerability};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Report requested from the worker workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Static analysis report of one language subtask.
    Sast,
    /// Secret detection report.
    SecretDetection,
    /// Code-line count summary (standard or comparison).
    Cloc,
    /// Dynamic scan report.
    Dast,
}

impl ReportKind {
    /// Returns the report a scanning subtask of `variant` produces.
    #[must_use]
    pub const fn for_scan_variant(variant: Variant) -> Self {
        match variant {
            Variant::SecretScan => Self::SecretDetection,
            Variant::Browser(_) | Variant::Language(_) => Self::Sast,
        }
    }
}

/// Concrete layout of a fetched report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// `gl-sast-report.json`.
    Sast,
    /// `gl-secret-detection-report.json`.
    SecretDetection,
    /// `cloc_summary.json`.
    ClocSummary,
    /// `cloc_comparison_summary.json`.
    ClocComparison,
    /// `gl-dast-report.json`.
    Dast,
}

/// Structured result document produced by a completed worker job.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDocument {
    /// Layout of `body`.
    pub format: ReportFormat,
    /// Parsed JSON content.
    pub body: Value,
}

/// Error raised when a result document does not match its layout.
#[derive(Debug, Clone, Error)]
#[error("malformed {format:?} report: {source}")]
pub struct ReportParseError {
    /// Layout that was expected.
    pub format: ReportFormat,
    /// Underlying decoding failure.
    pub source: Arc<serde_json::Error>,
}

impl ReportParseError {
    fn new(format: ReportFormat, err: serde_json::Error) -> Self {
        Self {
            format,
            source: Arc::new(err),
        }
    }
}

/// Repository coordinates used to build deep links for static findings.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    /// Engine hosting the repository.
    pub engine: GitEngine,
    /// Repository URL.
    pub source: &'a SourceLocator,
    /// Scanned branch.
    pub branch: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct StaticReport {
    #[serde(default)]
    vulnerabilities: Vec<StaticEntry>,
}

#[derive(Debug, Deserialize)]
struct StaticEntry {
    message: Option<String>,
    severity: Option<String>,
    #[serde(default)]
    location: StaticLocation,
}

#[derive(Debug, Default, Deserialize)]
struct StaticLocation {
    file: Option<String>,
    start_line: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct DynamicReport {
    #[serde(default)]
    scan: DynamicScan,
    #[serde(default)]
    vulnerabilities: Vec<DynamicEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DynamicScan {
    start_time: Option<String>,
    end_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DynamicEntry {
    description: Option<String>,
    confidence: Option<String>,
    severity: Option<String>,
    message: Option<String>,
    solution: Option<String>,
    cve: Option<String>,
    details: Option<DynamicDetails>,
    evidence: Option<DynamicEvidence>,
}

#[derive(Debug, Clone, Deserialize)]
struct DynamicDetails {
    urls: Option<DynamicUrls>,
}

#[derive(Debug, Clone, Deserialize)]
struct DynamicUrls {
    #[serde(default)]
    items: Vec<DynamicUrlItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct DynamicUrlItem {
    href: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DynamicEvidence {
    request: Option<DynamicRequest>,
}

#[derive(Debug, Clone, Deserialize)]
struct DynamicRequest {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClocCounts {
    #[serde(rename = "nFiles", default)]
    files: u64,
    #[serde(default)]
    blank: u64,
    #[serde(default)]
    comment: u64,
    #[serde(default)]
    code: u64,
}

const CLOC_HEADER: &str = "header";
const CLOC_SUM: &str = "SUM";

/// Converts a static analysis or secret detection report into findings.
///
/// The scanner message doubles as the description, and a deep link is
/// attached when both file and start line are present.
///
/// # Errors
///
/// Returns [`ReportParseError`] when the document is not a static report.
pub fn parse_static_findings(
    document: &ResultDocument,
    link: LinkContext<'_>,
) -> Result<Vec<Vulnerability>, ReportParseError> {
    let report = StaticReport::deserialize(&document.body)
        .map_err(|err| ReportParseError::new(document.format, err))?;

    Ok(report
        .vulnerabilities
        .into_iter()
        .map(|entry| {
            let line = entry.location.start_line.as_ref().and_then(scalar_text);
            let deep_link = entry
                .location
                .file
                .as_deref()
                .zip(line.as_deref())
                .and_then(|(file, start)| {
                    link.engine.deep_link(link.source, link.branch, file, start)
                });
            Vulnerability {
                description: entry.message.clone(),
                message: entry.message,
                severity: entry.severity,
                location: entry.location.file,
                line,
                link: deep_link,
                ..Vulnerability::default()
            }
        })
        .collect())
}

/// Converts a cloc summary or comparison report into line-count rows.
///
/// # Errors
///
/// Returns [`ReportParseError`] when the document is not a cloc report.
pub fn parse_line_counts(document: &ResultDocument) -> Result<Vec<LineCount>, ReportParseError> {
    let mut sections = Map::<String, Value>::deserialize(&document.body)
        .map_err(|err| ReportParseError::new(document.format, err))?;
    sections.remove(CLOC_HEADER);

    let mut rows = Vec::new();
    for (key, value) in sections {
        if document.format == ReportFormat::ClocComparison {
            let entries = Map::<String, Value>::deserialize(&value)
                .map_err(|err| ReportParseError::new(document.format, err))?;
            for (name, counts_value) in entries {
                let counts = counts_of(document.format, &counts_value)?;
                let row = if key == CLOC_SUM {
                    LineCount {
                        action: Some(name),
                        title: Some(CLOC_SUM.to_owned()),
                        ..counts.into_row()
                    }
                } else {
                    LineCount {
                        action: Some(key.clone()),
                        language: Some(name),
                        ..counts.into_row()
                    }
                };
                rows.push(row);
            }
        } else {
            let counts = counts_of(document.format, &value)?;
            rows.push(LineCount {
                language: Some(key),
                ..counts.into_row()
            });
        }
    }
    Ok(rows)
}

/// Converts a dynamic scan report into findings, merging duplicates.
///
/// Findings sharing a message collapse into the first-seen one. Its location
/// is the first finding's detail URLs when present, otherwise the distinct
/// request URLs of every duplicate joined with commas.
///
/// # Errors
///
/// Returns [`ReportParseError`] when the document is not a dynamic report.
pub fn parse_dynamic_findings(
    document: &ResultDocument,
) -> Result<Vec<Vulnerability>, ReportParseError> {
    let report = DynamicReport::deserialize(&document.body)
        .map_err(|err| ReportParseError::new(document.format, err))?;

    let mut groups: Vec<(DynamicEntry, Vec<String>)> = Vec::new();
    for entry in report.vulnerabilities {
        let request_url = entry
            .evidence
            .as_ref()
            .and_then(|evidence| evidence.request.as_ref())
            .and_then(|request| request.url.clone());
        match groups
            .iter_mut()
            .find(|(first, _)| first.message == entry.message)
        {
            Some((_, urls)) => push_distinct(urls, request_url),
            None => {
                let mut urls = Vec::new();
                push_distinct(&mut urls, request_url);
                groups.push((entry, urls));
            }
        }
    }

    Ok(groups
        .into_iter()
        .map(|(first, urls)| {
            let location = detail_urls(&first).unwrap_or_else(|| urls.join(","));
            Vulnerability {
                description: first.description,
                message: first.message,
                severity: first.severity,
                confidence: first.confidence,
                solution: first.solution,
                cve: first.cve,
                location: Some(location),
                scan_started_at: report.scan.start_time.clone(),
                scan_ended_at: report.scan.end_time.clone(),
                ..Vulnerability::default()
            }
        })
        .collect())
}

impl ClocCounts {
    const fn into_row(self) -> LineCount {
        LineCount {
            language: None,
            action: None,
            title: None,
            files: self.files,
            blank: self.blank,
            comment: self.comment,
            code: self.code,
        }
    }
}

fn counts_of(format: ReportFormat, value: &Value) -> Result<ClocCounts, ReportParseError> {
    ClocCounts::deserialize(value).map_err(|err| ReportParseError::new(format, err))
}

fn detail_urls(entry: &DynamicEntry) -> Option<String> {
    let items = &entry.details.as_ref()?.urls.as_ref()?.items;
    if items.is_empty() {
        return None;
    }
    Some(
        items
            .iter()
            .map(|item| item.href.as_str())
            .collect::<Vec<_>>()
            .join(","),
    )
}

fn push_distinct(urls: &mut Vec<String>, candidate: Option<String>) {
    if let Some(url) = candidate
        && !urls.contains(&url)
    {
        urls.push(url);
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn document(format: ReportFormat, body: Value) -> ResultDocument {
        ResultDocument { format, body }
    }

    #[rstest]
    fn static_findings_carry_deep_links() {
        let source = SourceLocator::new("https://github.com/acme/api.git").expect("valid locator");
        let report = document(
            ReportFormat::Sast,
            json!({
                "vulnerabilities": [
                    {"message": "SQL injection", "severity": "High",
                     "location": {"file": "app/db.py", "start_line": 42}},
                    {"message": "Weak hash", "severity": "Low", "location": {}}
                ]
            }),
        );
        let link = LinkContext {
            engine: GitEngine::Github,
            source: &source,
            branch: "main",
        };

        let findings = parse_static_findings(&report, link).expect("report should parse");

        assert_eq!(findings.len(), 2);
        let first = findings.first().expect("first finding");
        assert_eq!(first.description.as_deref(), Some("SQL injection"));
        assert_eq!(first.line.as_deref(), Some("42"));
        assert_eq!(
            first.link.as_deref(),
            Some("https://github.com/acme/api/blob/main/app/db.py#L42")
        );
        assert_eq!(findings.get(1).and_then(|f| f.link.as_deref()), None);
    }

    #[rstest]
    fn static_report_without_findings_is_empty() {
        let source = SourceLocator::new("https://gitlab.com/acme/api").expect("valid locator");
        let link = LinkContext {
            engine: GitEngine::Gitlab,
            source: &source,
            branch: "dev",
        };

        let findings = parse_static_findings(&document(ReportFormat::SecretDetection, json!({})), link)
            .expect("empty report should parse");

        assert!(findings.is_empty());
    }

    #[rstest]
    fn cloc_summary_drops_header() {
        let report = document(
            ReportFormat::ClocSummary,
            json!({
                "header": {"cloc_version": "1.90"},
                "Rust": {"nFiles": 3, "blank": 10, "comment": 5, "code": 120},
                "SUM": {"nFiles": 3, "blank": 10, "comment": 5, "code": 120}
            }),
        );

        let rows = parse_line_counts(&report).expect("summary should parse");

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.action.is_none()));
        assert!(rows.iter().any(|row| row.language.as_deref() == Some("Rust") && row.code == 120));
    }

    #[rstest]
    fn cloc_comparison_tags_actions_and_sums() {
        let report = document(
            ReportFormat::ClocComparison,
            json!({
                "header": {},
                "added": {"Rust": {"nFiles": 1, "blank": 0, "comment": 0, "code": 9}},
                "SUM": {
                    "added": {"nFiles": 1, "blank": 0, "comment": 0, "code": 9},
                    "removed": {"nFiles": 0, "blank": 0, "comment": 0, "code": 0}
                }
            }),
        );

        let rows = parse_line_counts(&report).expect("comparison should parse");

        assert_eq!(rows.len(), 3);
        let language_row = rows
            .iter()
            .find(|row| row.language.is_some())
            .expect("language row");
        assert_eq!(language_row.action.as_deref(), Some("added"));
        let sums: Vec<_> = rows
            .iter()
            .filter(|row| row.title.as_deref() == Some("SUM"))
            .filter_map(|row| row.action.as_deref())
            .collect();
        assert_eq!(sums, vec!["added", "removed"]);
    }

    #[rstest]
    fn dynamic_duplicates_merge_distinct_locations() {
        let report = document(
            ReportFormat::Dast,
            json!({
                "scan": {"start_time": "2024-01-01T00:00:00", "end_time": "2024-01-01T01:00:00"},
                "vulnerabilities": [
                    {"message": "X", "severity": "High", "evidence": {"request": {"url": "A"}}},
                    {"message": "X", "severity": "Low", "evidence": {"request": {"url": "B"}}},
                    {"message": "X", "evidence": {"request": {"url": "A"}}},
                    {"message": "Y", "evidence": {"request": {"url": "C"}}}
                ]
            }),
        );

        let findings = parse_dynamic_findings(&report).expect("dast report should parse");

        assert_eq!(findings.len(), 2);
        let merged = findings.first().expect("merged finding");
        assert_eq!(merged.location.as_deref(), Some("A,B"));
        assert_eq!(merged.severity.as_deref(), Some("High"));
        assert_eq!(merged.scan_started_at.as_deref(), Some("2024-01-01T00:00:00"));
    }

    #[rstest]
    fn dynamic_detail_urls_take_precedence() {
        let report = document(
            ReportFormat::Dast,
            json!({
                "vulnerabilities": [{
                    "message": "Z",
                    "details": {"urls": {"items": [{"href": "https://a"}, {"href": "https://b"}]}},
                    "evidence": {"request": {"url": "https://c"}}
                }]
            }),
        );

        let findings = parse_dynamic_findings(&report).expect("dast report should parse");

        assert_eq!(
            findings.first().and_then(|f| f.location.as_deref()),
            Some("https://a,https://b")
        );
    }

    #[rstest]
    fn malformed_cloc_report_is_rejected() {
        let report = document(ReportFormat::ClocSummary, json!(["not", "a", "map"]));

        let result = parse_line_counts(&report);

        assert!(matches!(
            result,
            Err(ReportParseError {
                format: ReportFormat::ClocSummary,
                ..
            })
        ));
    }
}
