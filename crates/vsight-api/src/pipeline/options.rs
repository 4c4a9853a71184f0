//! Request option parsing.

use serde_json::{Map, Value};
use tracing::debug;
use url::Url;
use vsight_models::features::chip_target_for;
use vsight_models::{
    AnalyzeOptions, ChipTarget, EmbeddingsVersion, RawOptions, ReferenceRef, SceneChangeOptions,
};

use super::context::RequestKind;
use super::error::{PipelineError, PipelineResult};

/// Validate and normalize client options.
pub fn parse_options(raw: &RawOptions, kind: RequestKind) -> PipelineResult<AnalyzeOptions> {
    let embeddings_version = match raw.face_chips_embeddings_version.as_deref() {
        None => EmbeddingsVersion::default(),
        Some(version) => version.parse::<EmbeddingsVersion>().map_err(|_| {
            PipelineError::invalid(format!(
                "faceChipsEmbeddingsVersion must be \"5\" or \"6\", got \"{}\"",
                version
            ))
        })?,
    };

    let references = raw
        .scene_change_reference_urls
        .iter()
        .flatten()
        .map(|url| {
            ensure_absolute_url(url, "sceneChangeReferenceUrls")?;
            Ok(ReferenceRef::url(url.clone()))
        })
        .collect::<PipelineResult<Vec<_>>>()?;

    let analysis_type = match (&raw.analysis_type, kind) {
        (Some(selector), RequestKind::Chip) => Some(parse_analysis_type(selector)?),
        (Some(_), RequestKind::Alarm) => {
            debug!("Ignoring analysisType on an alarm request");
            None
        }
        (None, _) => None,
    };

    Ok(AnalyzeOptions {
        scene_change: SceneChangeOptions {
            force: raw.perform_scene_change_detection.is_some(),
            perform: raw.perform_scene_change_detection.unwrap_or(false),
            references,
        },
        embeddings_version,
        analysis_type,
    })
}

/// Resolve the client's single `analysisType` entry to a chip detection.
fn parse_analysis_type(selector: &Map<String, Value>) -> PipelineResult<ChipTarget> {
    let mut entries = selector.iter();
    let (name, config) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => return Err(PipelineError::invalid("analysisType must contain one analysis type")),
    };

    match name.as_str() {
        "personAnalysis" => Ok(ChipTarget::Person),
        "vehicleAnalysis" => Ok(chip_target_for(
            config.get("chipsType").and_then(Value::as_str),
        )),
        "faceDetection" => Ok(ChipTarget::Face),
        "gunDetection" => Ok(ChipTarget::Gun),
        other => Err(PipelineError::invalid(format!(
            "Unknown analysis type '{}'",
            other
        ))),
    }
}

/// Accept only absolute http(s) URLs.
pub fn ensure_absolute_url(value: &str, field: &str) -> PipelineResult<()> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(PipelineError::invalid(format!(
            "{} must contain absolute URLs, got '{}'",
            field, value
        ))),
    }
}
