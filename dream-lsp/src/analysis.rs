//! The analysis worker thread.
//!
//! Compiler invocations are blocking subprocess calls, so they run on one
//! dedicated thread fed by a channel. A single thread also serializes
//! passes: a new edit queues a new pass rather than overlapping with an
//! in-flight one, and each completed pass replaces the previous result
//! wholesale. The worker owns the parse cache, so cache access needs no
//! locking.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tower_lsp::lsp_types::Url;

use crate::cache::{AnalysisResult, ParseCache};
use crate::compiler;
use crate::diagnostics;
use crate::symbols;

type WorkerResult<T> = std::result::Result<T, String>;

enum AnalysisJob {
    Analyze {
        uri: Url,
        text: String,
        exe: PathBuf,
        resp: oneshot::Sender<AnalysisResult>,
    },
}

#[derive(Clone)]
pub struct AnalysisWorker {
    tx: mpsc::UnboundedSender<AnalysisJob>,
}

impl AnalysisWorker {
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AnalysisJob>();

        std::thread::Builder::new()
            .name("dream-compiler-worker".to_string())
            .spawn(move || {
                let mut cache = ParseCache::new();

                while let Some(job) = rx.blocking_recv() {
                    match job {
                        AnalysisJob::Analyze {
                            uri,
                            text,
                            exe,
                            resp,
                        } => {
                            let result = run_analysis(&mut cache, &uri, &text, &exe);
                            let _ = resp.send(result);
                        }
                    }
                }
            })
            .expect("spawn dream-compiler-worker thread");

        Self { tx }
    }

    pub async fn analyze(
        &self,
        uri: Url,
        text: String,
        exe: PathBuf,
    ) -> WorkerResult<AnalysisResult> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(AnalysisJob::Analyze {
                uri,
                text,
                exe,
                resp: resp_tx,
            })
            .map_err(|_| "dream-compiler-worker channel closed".to_string())?;

        resp_rx
            .await
            .map_err(|_| "dream-compiler-worker dropped response".to_string())
    }
}

/// One full pass: cache lookup, compiler invocation, diagnostic and symbol
/// reconstruction, cache fill. Invocation failures become a single
/// synthetic diagnostic and are deliberately not cached, so the next edit
/// retries the compiler.
fn run_analysis(cache: &mut ParseCache, uri: &Url, text: &str, exe: &PathBuf) -> AnalysisResult {
    let key = ParseCache::key(uri.as_str(), text);
    if let Some(hit) = cache.get(&key) {
        return hit;
    }

    let raw = match compiler::analyze_source(exe, text) {
        Ok(raw) => raw,
        Err(err) => {
            let message = err.to_string();
            return AnalysisResult {
                success: false,
                diagnostics: vec![diagnostics::invocation_failure(message.clone())],
                symbols: Vec::new(),
                raw_errors: vec![message],
            };
        }
    };

    let mut symbols = symbols::parse_symbols_json(&raw.symbols_json);
    if symbols.is_empty() {
        symbols = symbols::scan_symbols(text);
    }

    let result = AnalysisResult {
        success: raw.success,
        diagnostics: diagnostics::parse_diagnostics(&raw.diagnostics_stderr, text),
        symbols,
        raw_errors: raw
            .diagnostics_stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect(),
    };

    cache.put(key, result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn missing_compiler_becomes_soft_failure() {
        let mut cache = ParseCache::new();
        let uri = Url::parse("file:///tmp/missing.dr").unwrap();
        let exe = PathBuf::from("/nonexistent/dream-parse-binary");

        let result = run_analysis(&mut cache, &uri, "func main() {}", &exe);
        assert!(!result.success);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].source.as_deref(),
            Some(diagnostics::SOURCE_SERVER)
        );
        // Failures are not cached; the next pass retries.
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_result_is_returned_without_reinvocation() {
        let mut cache = ParseCache::new();
        let uri = Url::parse("file:///tmp/cached.dr").unwrap();
        let text = "func main() {}";
        let key = ParseCache::key(uri.as_str(), text);

        let canned = AnalysisResult {
            success: true,
            raw_errors: vec!["canned".to_string()],
            ..AnalysisResult::default()
        };
        cache.put(key, canned);

        // The executable path is bogus; a cache hit never touches it.
        let exe = PathBuf::from("/nonexistent/dream-parse-binary");
        let result = run_analysis(&mut cache, &uri, text, &exe);
        assert!(result.success);
        assert_eq!(result.raw_errors, vec!["canned".to_string()]);
    }

    #[tokio::test]
    async fn worker_round_trips_a_request() {
        let worker = AnalysisWorker::spawn();
        let uri = Url::parse("file:///tmp/roundtrip.dr").unwrap();
        let result = worker
            .analyze(
                uri,
                "func main() {}".to_string(),
                PathBuf::from("/nonexistent/dream-parse-binary"),
            )
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.diagnostics.len(), 1);
    }
}
