#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use regex::Regex;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

use dream_lsp::analysis::AnalysisWorker;
use dream_lsp::builtins;
use dream_lsp::compiler;
use dream_lsp::config::{self, Settings};
use dream_lsp::diagnostics;
use dream_lsp::symbols::{SymbolInfo, SymbolInfoKind};
use dream_lsp::text::{ident_prefix_at, word_at_position};

/// Per-document state, replaced wholesale after every analysis pass.
#[derive(Clone, Debug, Default)]
struct DocumentInfo {
    text: String,
    symbols: Vec<SymbolInfo>,
    diagnostics: Vec<Diagnostic>,
}

impl DocumentInfo {
    fn symbol(&self, name: &str) -> Option<&SymbolInfo> {
        self.symbols.iter().find(|s| s.name == name)
    }
}

struct Backend {
    client: Client,
    docs: RwLock<HashMap<Url, DocumentInfo>>,
    settings: RwLock<Settings>,
    workspace_root: RwLock<Option<PathBuf>>,
    worker: AnalysisWorker,
}

impl Backend {
    fn new(client: Client) -> Self {
        Self {
            client,
            docs: RwLock::new(HashMap::new()),
            settings: RwLock::new(Settings::default()),
            workspace_root: RwLock::new(None),
            worker: AnalysisWorker::spawn(),
        }
    }

    /// Resolve the compiler executable for a document: client settings win,
    /// then a `dream.toml` next to the file, then discovery.
    async fn compiler_exe_for(&self, uri: &Url) -> PathBuf {
        if let Some(path) = self.settings.read().await.compiler_path.clone() {
            return path;
        }

        if let Some(manifest_path) = uri.to_file_path().ok().and_then(|p| config::find_manifest(&p)) {
            if let Some(manifest) = config::load_manifest(&manifest_path) {
                if let Some(rel) = manifest.compiler.path {
                    if rel.is_absolute() {
                        return rel;
                    }
                    if let Some(dir) = manifest_path.parent() {
                        return dir.join(rel);
                    }
                }
            }
        }

        let root = self.workspace_root.read().await.clone();
        compiler::locate_parse_executable(None, root.as_deref())
    }

    /// One analysis pass: hand the text to the worker, replace this
    /// document's symbols and diagnostics, publish. Worker failures (a
    /// closed channel, not compiler failures — those already come back as
    /// synthetic diagnostics) degrade to a single server-sourced error.
    async fn analyze_and_publish(&self, uri: &Url) {
        let text = {
            let docs = self.docs.read().await;
            match docs.get(uri) {
                Some(info) => info.text.clone(),
                None => return,
            }
        };

        let exe = self.compiler_exe_for(uri).await;
        let result = match self.worker.analyze(uri.clone(), text, exe).await {
            Ok(result) => result,
            Err(msg) => dream_lsp::cache::AnalysisResult {
                success: false,
                diagnostics: vec![diagnostics::invocation_failure(msg.clone())],
                symbols: Vec::new(),
                raw_errors: vec![msg],
            },
        };

        let max_problems = self.settings.read().await.max_problems;
        let mut published = result.diagnostics.clone();
        if let Some(max) = max_problems {
            published.truncate(max);
        }

        {
            let mut docs = self.docs.write().await;
            if let Some(info) = docs.get_mut(uri) {
                info.symbols = result.symbols;
                info.diagnostics = published.clone();
            }
        }

        self.client
            .publish_diagnostics(uri.clone(), published, None)
            .await;
    }
}

fn uri_basename(uri: &Url) -> String {
    uri.path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or_default()
        .to_string()
}

/// Completion candidates, tiered by sort text: keywords first, then this
/// document's symbols, then func/class symbols from other open documents.
fn completion_items(
    prefix: &str,
    current: &DocumentInfo,
    current_uri: &Url,
    all_docs: &HashMap<Url, DocumentInfo>,
) -> Vec<CompletionItem> {
    let mut items: Vec<CompletionItem> = Vec::new();

    for kw in dream_tokens::keywords() {
        if prefix.is_empty() || kw.starts_with(prefix) {
            items.push(CompletionItem {
                label: kw.to_string(),
                kind: Some(CompletionItemKind::KEYWORD),
                detail: Some("Dream keyword".to_string()),
                sort_text: Some(format!("1_{kw}")),
                ..CompletionItem::default()
            });
        }
    }

    items.extend(builtins::builtin_completions());

    for sym in &current.symbols {
        items.push(CompletionItem {
            label: sym.name.clone(),
            kind: Some(sym.kind.completion_kind()),
            detail: Some(
                sym.detail
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", sym.kind.label(), sym.name)),
            ),
            sort_text: Some(format!("2_{}", sym.name)),
            ..CompletionItem::default()
        });
    }

    for (uri, info) in all_docs {
        if uri == current_uri {
            continue;
        }
        for sym in &info.symbols {
            if !matches!(sym.kind, SymbolInfoKind::Func | SymbolInfoKind::Class) {
                continue;
            }
            items.push(CompletionItem {
                label: sym.name.clone(),
                kind: Some(sym.kind.completion_kind()),
                detail: Some(format!(
                    "{} {} (from {})",
                    sym.kind.label(),
                    sym.name,
                    uri_basename(uri)
                )),
                sort_text: Some(format!("3_{}", sym.name)),
                ..CompletionItem::default()
            });
        }
    }

    items
}

/// Whole-word rename within one document. The compiler offers no semantic
/// rename surface, so this is a textual edit over every occurrence.
fn rename_edits(text: &str, word: &str, new_name: &str) -> Vec<TextEdit> {
    let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(word))) else {
        return Vec::new();
    };

    re.find_iter(text)
        .map(|m| TextEdit {
            range: Range {
                start: dream_lsp::text::position_from_offset(text, m.start()),
                end: dream_lsp::text::position_from_offset(text, m.end()),
            },
            new_text: new_name.to_string(),
        })
        .collect()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        {
            let mut root = self.workspace_root.write().await;
            *root = params
                .root_uri
                .as_ref()
                .and_then(|u| u.to_file_path().ok());
        }

        if let Some(options) = params.initialization_options.as_ref() {
            let mut settings = self.settings.write().await;
            *settings = config::settings_from_value(options);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![
                        ".".to_string(),
                        ":".to_string(),
                        "(".to_string(),
                        "<".to_string(),
                    ]),
                    ..CompletionOptions::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions {
                        work_done_progress: Some(false),
                    },
                }),
                document_formatting_provider: Some(OneOf::Left(true)),
                document_range_formatting_provider: Some(OneOf::Left(true)),
                rename_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "dream-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let _ = self
            .client
            .log_message(MessageType::INFO, "Dream LSP initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut docs = self.docs.write().await;
            docs.insert(
                uri.clone(),
                DocumentInfo {
                    text: params.text_document.text,
                    ..DocumentInfo::default()
                },
            );
        }
        self.analyze_and_publish(&uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;

        if let Some(change) = params.content_changes.into_iter().last() {
            let mut docs = self.docs.write().await;
            let info = docs.entry(uri.clone()).or_default();
            info.text = change.text;
        }

        self.analyze_and_publish(&uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut docs = self.docs.write().await;
            docs.remove(&uri);
        }
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let mut settings = self.settings.write().await;
        *settings = config::settings_from_value(&params.settings);
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let pos = params.text_document_position.position;

        let docs = self.docs.read().await;
        let Some(current) = docs.get(&uri) else {
            return Ok(Some(CompletionResponse::Array(Vec::new())));
        };

        let prefix = ident_prefix_at(&current.text, pos);
        let items = completion_items(&prefix, current, &uri, &docs);
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;

        let docs = self.docs.read().await;
        let Some(current) = docs.get(&uri) else {
            return Ok(None);
        };

        let word = word_at_position(&current.text, pos);
        if word.is_empty() {
            return Ok(None);
        }

        if let Some(doc) = builtins::builtin_hover(&word) {
            return Ok(Some(Hover {
                contents: HoverContents::Markup(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: doc.to_string(),
                }),
                range: None,
            }));
        }

        if let Some(sym) = current.symbol(&word) {
            let mut value = format!("**{}** `{}`", sym.kind.label(), word);
            if let Some(ty) = &sym.ty {
                value.push_str(&format!(": {ty}"));
            }
            if let Some(detail) = &sym.detail {
                value.push_str(&format!("\n\n{detail}"));
            }
            return Ok(Some(Hover {
                contents: HoverContents::Markup(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value,
                }),
                range: None,
            }));
        }

        for (other_uri, info) in docs.iter() {
            if other_uri == &uri {
                continue;
            }
            if let Some(sym) = info.symbol(&word) {
                let mut value = format!(
                    "**{}** `{}` *(from {})*",
                    sym.kind.label(),
                    word,
                    uri_basename(other_uri)
                );
                if let Some(ty) = &sym.ty {
                    value.push_str(&format!("\n\nType: `{ty}`"));
                }
                return Ok(Some(Hover {
                    contents: HoverContents::Markup(MarkupContent {
                        kind: MarkupKind::Markdown,
                        value,
                    }),
                    range: None,
                }));
            }
        }

        Ok(None)
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;

        let docs = self.docs.read().await;
        let Some(current) = docs.get(&uri) else {
            return Ok(None);
        };

        let word = word_at_position(&current.text, pos);
        if word.is_empty() {
            return Ok(None);
        }

        if let Some(sym) = current.symbol(&word) {
            return Ok(Some(GotoDefinitionResponse::Scalar(Location {
                uri,
                range: sym.range(),
            })));
        }

        for (other_uri, info) in docs.iter() {
            if other_uri == &uri {
                continue;
            }
            if let Some(sym) = info.symbol(&word) {
                return Ok(Some(GotoDefinitionResponse::Scalar(Location {
                    uri: other_uri.clone(),
                    range: sym.range(),
                })));
            }
        }

        Ok(None)
    }

    #[allow(deprecated)]
    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let docs = self.docs.read().await;
        let Some(info) = docs.get(&uri) else {
            return Ok(None);
        };

        let symbols: Vec<SymbolInformation> = info
            .symbols
            .iter()
            .map(|sym| SymbolInformation {
                name: sym.name.clone(),
                kind: sym.kind.symbol_kind(),
                tags: None,
                deprecated: None,
                location: Location {
                    uri: uri.clone(),
                    range: sym.range(),
                },
                container_name: None,
            })
            .collect();

        Ok(Some(DocumentSymbolResponse::Flat(symbols)))
    }

    #[allow(deprecated)]
    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<Vec<SymbolInformation>>> {
        let query = params.query.to_lowercase();
        let docs = self.docs.read().await;

        let mut out: Vec<SymbolInformation> = Vec::new();
        for (uri, info) in docs.iter() {
            for sym in &info.symbols {
                if !sym.name.to_lowercase().contains(&query) {
                    continue;
                }
                out.push(SymbolInformation {
                    name: sym.name.clone(),
                    kind: sym.kind.symbol_kind(),
                    tags: None,
                    deprecated: None,
                    location: Location {
                        uri: uri.clone(),
                        range: sym.range(),
                    },
                    container_name: Some(uri_basename(uri)),
                });
            }
        }

        Ok(Some(out))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;

        let docs = self.docs.read().await;
        let Some(info) = docs.get(&uri) else {
            return Ok(None);
        };

        let line = info
            .text
            .split('\n')
            .nth(pos.line as usize)
            .unwrap_or_default();
        let prefix: String = line.chars().take(pos.character as usize).collect();
        Ok(builtins::signature_for_line_prefix(&prefix))
    }

    // Formatting is declared but deliberately a no-op until the compiler
    // grows a formatter; clients treat an empty edit list as "no changes".
    async fn formatting(&self, _params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        Ok(Some(Vec::new()))
    }

    async fn range_formatting(
        &self,
        _params: DocumentRangeFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        Ok(Some(Vec::new()))
    }

    async fn rename(&self, params: RenameParams) -> Result<Option<WorkspaceEdit>> {
        let uri = params.text_document_position.text_document.uri;
        let pos = params.text_document_position.position;

        let docs = self.docs.read().await;
        let Some(info) = docs.get(&uri) else {
            return Ok(None);
        };

        let word = word_at_position(&info.text, pos);
        if word.is_empty() {
            return Ok(None);
        }

        let edits = rename_edits(&info.text, &word, &params.new_name);
        let mut changes = HashMap::new();
        changes.insert(uri, edits);
        Ok(Some(WorkspaceEdit {
            changes: Some(changes),
            ..WorkspaceEdit::default()
        }))
    }
}


#[tokio::main]
async fn main() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new).finish();
    Server::new(stdin, stdout, socket).serve(service).await;
}
