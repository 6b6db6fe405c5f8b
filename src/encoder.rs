//! Report encoding
//!
//! This module encodes a score breakdown into the engagement report document
//! returned to callers of the scoring service.

use crate::context::AnalysisContext;
use crate::error::AnalysisResult;
use crate::types::ScoreBreakdown;
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Timestamp layout of the report: local wall-clock time with microseconds
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One reported signal count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalValue {
    pub value: u32,
}

/// Engagement report for one analyzed recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementReport {
    pub timestamp: String,
    pub score: f64,
    pub blink: SignalValue,
    pub gaze: SignalValue,
    pub disfluency: SignalValue,
    pub urlvideo: Option<String>,
}

/// Encoder for engagement reports
#[derive(Debug, Clone, Default)]
pub struct ReportEncoder {
    pretty: bool,
}

impl ReportEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder producing indented JSON
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Build a report stamped with the current local time
    pub fn encode(&self, breakdown: &ScoreBreakdown, urlvideo: Option<&str>) -> EngagementReport {
        self.encode_at(breakdown, urlvideo, Local::now())
    }

    /// Build the report for the run behind `ctx`, echoing its source URL
    pub fn encode_for_context(
        &self,
        breakdown: &ScoreBreakdown,
        ctx: &AnalysisContext,
    ) -> EngagementReport {
        self.encode(breakdown, ctx.source_url())
    }

    /// Build a report stamped with `at`
    pub fn encode_at<Tz>(
        &self,
        breakdown: &ScoreBreakdown,
        urlvideo: Option<&str>,
        at: DateTime<Tz>,
    ) -> EngagementReport
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        EngagementReport {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            score: breakdown.composite_score,
            blink: SignalValue {
                value: breakdown.blink_count,
            },
            gaze: SignalValue {
                value: breakdown.gaze_count,
            },
            disfluency: SignalValue {
                value: breakdown.disfluency_count,
            },
            urlvideo: urlvideo.map(str::to_string),
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        breakdown: &ScoreBreakdown,
        urlvideo: Option<&str>,
    ) -> AnalysisResult<String> {
        let report = self.encode(breakdown, urlvideo);
        self.to_json(&report)
    }

    pub fn to_json(&self, report: &EngagementReport) -> AnalysisResult<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(json)
    }
}
