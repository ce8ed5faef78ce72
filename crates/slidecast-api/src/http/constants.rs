//! Shared HTTP constants (headers, problem URIs, media types).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

pub(crate) const CONTENT_TYPE_MP4: &str = "video/mp4";
pub(crate) const CONTENT_TYPE_METRICS: &str = "text/plain; version=0.0.4";
pub(crate) const SYNC_DOWNLOAD_NAME: &str = "slideshow.mp4";

pub(crate) const PROBLEM_INTERNAL: &str = "https://slidecast.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://slidecast.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://slidecast.dev/problems/not-found";
pub(crate) const PROBLEM_CONFLICT: &str = "https://slidecast.dev/problems/job-failed";
pub(crate) const PROBLEM_TOO_EARLY: &str = "https://slidecast.dev/problems/not-ready";
