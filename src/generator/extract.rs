// Response extractor - locates fields in loosely structured provider JSON
//
// The provider nests the same datum under different paths depending on
// endpoint and API revision. Each field kind owns a probe table:
// - ordered candidate keys
// - ordered locations (top level, `data`, `data.results[0]`, `data.response.sunoData[0]`)
// - whether a depth-first search of the whole document may run as a last resort

use serde_json::Value;
use tracing::warn;

/// Fields the pipeline needs from provider responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Status,
    StatusDescription,
    AudioUrl,
    AudioId,
    VideoUrl,
    TaskId,
    FailureReason,
}

/// Static probe description for one field kind
#[derive(Debug)]
pub struct Probe {
    pub keys: &'static [&'static str],
    pub fallback: bool,
}

/// Path segments walked from the document root, in probe order
const LOCATIONS: &[&[Segment]] = &[
    &[],
    &[Segment::Key("data")],
    &[Segment::Key("data"), Segment::Key("results"), Segment::Index(0)],
    &[
        Segment::Key("data"),
        Segment::Key("response"),
        Segment::Key("sunoData"),
        Segment::Index(0),
    ],
];

#[derive(Debug, Clone, Copy)]
enum Segment {
    Key(&'static str),
    Index(usize),
}

impl FieldKind {
    pub fn probe(&self) -> Probe {
        match self {
            Self::Status => Probe {
                keys: &["status"],
                fallback: false,
            },
            Self::StatusDescription => Probe {
                keys: &["statusDesc", "status_desc"],
                fallback: false,
            },
            Self::AudioUrl => Probe {
                keys: &["audioUrl", "audio_url", "url", "mp3Url", "streamUrl"],
                fallback: true,
            },
            Self::AudioId => Probe {
                keys: &["audioId", "audio_id", "id"],
                fallback: true,
            },
            Self::VideoUrl => Probe {
                keys: &["video_url", "videoUrl", "url", "mp4Url", "mp4_url", "videoPath"],
                fallback: true,
            },
            Self::TaskId => Probe {
                keys: &["taskId", "task_id"],
                fallback: true,
            },
            Self::FailureReason => Probe {
                keys: &["errorMessage", "error", "errorReason", "error_reason"],
                fallback: false,
            },
        }
    }
}

/// Find the first non-empty value for `kind` in `doc`.
///
/// Structured locations are tried in order, each with every candidate key.
/// Returns `None` when nothing matches; never panics on odd shapes.
pub fn extract(doc: &Value, kind: FieldKind) -> Option<String> {
    let probe = kind.probe();

    for location in LOCATIONS {
        let Some(node) = walk(doc, location) else {
            continue;
        };
        if let Some(found) = probe.keys.iter().find_map(|key| scalar(&node[*key])) {
            return Some(found);
        }
    }

    if !probe.fallback {
        return None;
    }

    let found = probe.keys.iter().find_map(|key| search(doc, key))?;
    warn!(
        "[Extract] {:?} resolved by deep search; the response layout may have changed",
        kind
    );
    Some(found)
}

/// Resolve a video URL, prefixing relative paths with the file host.
pub fn resolve_video_url(raw: &str, file_host: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    format!(
        "{}/{}",
        file_host.trim_end_matches('/'),
        raw.trim_start_matches('/')
    )
}

fn walk<'a>(doc: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |node, seg| match seg {
        Segment::Key(k) => node.as_object()?.get(*k),
        Segment::Index(i) => node.as_array()?.get(*i),
    })
}

/// Non-empty string, or a number rendered as decimal
fn scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Depth-first search for `key` anywhere in the document
fn search(v: &Value, key: &str) -> Option<String> {
    match v {
        Value::Object(map) => {
            if let Some(found) = map.get(key).and_then(scalar) {
                return Some(found);
            }
            map.values().find_map(|child| search(child, key))
        }
        Value::Array(items) => items.iter().find_map(|child| search(child, key)),
        _ => None,
    }
}
