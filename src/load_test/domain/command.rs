//! Tool invocations for a load-test run.

use super::{LoadTest, LoadTestPlan};
use chrono::{DateTime, Utc};

const HTML_REPORT: &str = "index.html";
const REPORT_TITLE: &str = "Vulnerability Report - ";
const REPORT_AUTHOR: &str = "CITool";
const REPORT_DESCRIPTION: &str = "Check basic security";
const ALERT_SEVERITY: &str = "t;t;f;t";
const ALERT_DETAILS: &str = "t;t;t;t;t;t;f;f;f;f";

/// Tool locations used to build launch commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    /// Directory holding uploads and per-run output directories.
    pub media_root: String,
    /// `JMeter` executable.
    pub jmeter_bin: String,
    /// Parameterised plan for `CONFIG` runs.
    pub jmx_file: String,
    /// ZAP executable.
    pub zap_bin: String,
    /// ZAP home directory.
    pub zap_home: String,
    /// Raw sample log file name.
    pub result_file: String,
}

impl LaunchSettings {
    /// Returns `path` resolved under the media root.
    #[must_use]
    pub fn media_path(&self, path: &str) -> String {
        format!("{}/{path}", self.media_root.trim_end_matches('/'))
    }
}

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments, passed without shell interpretation.
    pub args: Vec<String>,
}

impl LaunchCommand {
    fn new(program: &str, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.to_owned(),
            args: args.into_iter().collect(),
        }
    }

    /// Renders the invocation as a shell-escaped command line for logs.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_escape)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Ordered invocations for one run and the report they produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Commands run in order; the first failure stops the run.
    pub steps: Vec<LaunchCommand>,
    /// Report file inside the run's output directory.
    pub report_file: String,
}

impl LaunchPlan {
    /// Builds the invocations for `run`, started at `started_at`.
    ///
    /// Security runs name their ZAP session and exported report after the
    /// start time in Unix seconds.
    #[must_use]
    pub fn for_run(run: &LoadTest, settings: &LaunchSettings, started_at: DateTime<Utc>) -> Self {
        let output_dir = settings.media_path(&format!("{}/", run.id()));
        let result_path = format!("{output_dir}{}", settings.result_file);
        let jmeter_tail = || {
            [
                "-f".to_owned(),
                "-l".to_owned(),
                result_path.clone(),
                "-e".to_owned(),
                "-o".to_owned(),
                output_dir.clone(),
            ]
        };

        match run.plan() {
            LoadTestPlan::Config {
                domain,
                port,
                protocol,
                ramp_time,
                num_threads,
                loops,
            } => {
                let mut args = vec![
                    "-n".to_owned(),
                    "-t".to_owned(),
                    settings.jmx_file.clone(),
                    format!("-Jdomain={domain}"),
                    format!("-Jport={port}"),
                    format!("-Jprotocol={protocol}"),
                    format!("-Jramp_time={ramp_time}"),
                    format!("-Jnum_threads={num_threads}"),
                    format!("-Jloops={loops}"),
                ];
                args.extend(jmeter_tail());
                Self {
                    steps: vec![LaunchCommand::new(&settings.jmeter_bin, args)],
                    report_file: HTML_REPORT.to_owned(),
                }
            }
            LoadTestPlan::Script { plan_file } => {
                let mut args = vec![
                    "-n".to_owned(),
                    "-t".to_owned(),
                    settings.media_path(plan_file),
                ];
                args.extend(jmeter_tail());
                Self {
                    steps: vec![LaunchCommand::new(&settings.jmeter_bin, args)],
                    report_file: HTML_REPORT.to_owned(),
                }
            }
            LoadTestPlan::Security { domain } => {
                security_plan(domain, settings, &output_dir, started_at)
            }
        }
    }
}

fn security_plan(
    domain: &str,
    settings: &LaunchSettings,
    output_dir: &str,
    started_at: DateTime<Utc>,
) -> LaunchPlan {
    let session = started_at.timestamp().to_string();
    let report_file = format!("{session}.xhtml");
    let report_date = started_at.format("%m/%d/%y").to_string();
    let source_info = [
        format!("{REPORT_TITLE}{domain}"),
        REPORT_AUTHOR.to_owned(),
        REPORT_AUTHOR.to_owned(),
        report_date.clone(),
        report_date,
        "N/A".to_owned(),
        "N/A".to_owned(),
        REPORT_DESCRIPTION.to_owned(),
    ]
    .join(";");

    let scan = LaunchCommand::new(
        &settings.zap_bin,
        [
            "-dir".to_owned(),
            settings.zap_home.clone(),
            "-quickurl".to_owned(),
            domain.to_owned(),
            "-newsession".to_owned(),
            session.clone(),
            "-cmd".to_owned(),
        ],
    );
    let export = LaunchCommand::new(
        &settings.zap_bin,
        [
            "-dir".to_owned(),
            settings.zap_home.clone(),
            "-export_report".to_owned(),
            format!("{output_dir}{report_file}"),
            "-source_info".to_owned(),
            source_info,
            "-alert_severity".to_owned(),
            ALERT_SEVERITY.to_owned(),
            "-alert_details".to_owned(),
            ALERT_DETAILS.to_owned(),
            "-session".to_owned(),
            format!("{session}.session"),
            "-cmd".to_owned(),
        ],
    );
    LaunchPlan {
        steps: vec![scan, export],
        report_file,
    }
}

/// Escapes a value for safe inclusion in a POSIX shell command.
///
/// Uses single-quote wrapping and the standard `'\''` sequence for embedded
/// quotes.
#[must_use]
pub fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}
