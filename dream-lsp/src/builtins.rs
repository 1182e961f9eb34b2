//! Built-in completion, hover, and signature data for the Dream runtime.
//!
//! The Console methods are the only runtime surface the compiler does not
//! report through `--symbols`, so the server carries them as static tables.

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, Documentation, InsertTextFormat, MarkupContent,
    MarkupKind, ParameterInformation, ParameterLabel, SignatureHelp, SignatureInformation,
};

fn method_item(label: &str, detail: &str, doc: &str, insert: &str, snippet: bool) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(CompletionItemKind::METHOD),
        detail: Some(detail.to_string()),
        documentation: Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: doc.to_string(),
        })),
        insert_text: Some(insert.to_string()),
        insert_text_format: Some(if snippet {
            InsertTextFormat::SNIPPET
        } else {
            InsertTextFormat::PLAIN_TEXT
        }),
        ..CompletionItem::default()
    }
}

/// Console method completions, snippet-style where a call site is useful.
pub fn builtin_completions() -> Vec<CompletionItem> {
    vec![
        method_item(
            "Console.WriteLine",
            "void Console.WriteLine(string text)",
            "Writes a line of text to the console output",
            "Console.WriteLine($1)",
            true,
        ),
        method_item(
            "Console.Write",
            "void Console.Write(string text)",
            "Writes text to the console output without newline",
            "Console.Write($1)",
            true,
        ),
        method_item(
            "Console.ReadLine",
            "string Console.ReadLine()",
            "Reads a line of input from the console",
            "Console.ReadLine()",
            false,
        ),
    ]
}

/// Hover markdown for built-in names; `None` defers to document symbols.
pub fn builtin_hover(word: &str) -> Option<&'static str> {
    let doc = match word {
        "Console.WriteLine" => {
            "**function** `Console.WriteLine(text: string): void`\n\nWrites a line of text to the console output."
        }
        "Console.Write" => {
            "**function** `Console.Write(text: string): void`\n\nWrites text to the console output without a newline."
        }
        "Console.ReadLine" => {
            "**function** `Console.ReadLine(): string`\n\nReads a line of input from the console."
        }
        "int" => "**type** `int`\n\nSigned 32-bit integer type.",
        "float" => "**type** `float`\n\nSingle-precision floating-point type.",
        "bool" => "**type** `bool`\n\nBoolean type (true or false).",
        "char" => "**type** `char`\n\nSingle character type.",
        "string" => "**type** `string`\n\nUTF-8 string type.",
        "void" => "**type** `void`\n\nRepresents no return value.",
        "true" => "**literal** `true`\n\nBoolean true value.",
        "false" => "**literal** `false`\n\nBoolean false value.",
        "null" => "**literal** `null`\n\nNull reference value.",
        "func" => "**keyword** `func`\n\nFunction declaration keyword.",
        "class" => "**keyword** `class`\n\nClass declaration keyword.",
        "struct" => "**keyword** `struct`\n\nStruct declaration keyword.",
        "module" => "**keyword** `module`\n\nModule declaration keyword.",
        "import" => "**keyword** `import`\n\nImport statement for modules.",
        "export" => "**keyword** `export`\n\nExport declaration for multi-file compilation.",
        "var" => "**keyword** `var`\n\nVariable declaration with type inference.",
        "let" => "**keyword** `let`\n\nImmutable variable declaration.",
        "async" => "**keyword** `async`\n\nAsynchronous function modifier.",
        "await" => "**keyword** `await`\n\nAwaits an asynchronous operation.",
        "Task" => "**type** `Task`\n\nRepresents an asynchronous task.",
        "TaskResult" => "**type** `TaskResult`\n\nRepresents a task with a result value.",
        _ => return None,
    };
    Some(doc)
}

fn signature(label: &str, doc: &str, param: &str, param_doc: &str) -> SignatureHelp {
    SignatureHelp {
        signatures: vec![SignatureInformation {
            label: label.to_string(),
            documentation: Some(Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: doc.to_string(),
            })),
            parameters: Some(vec![ParameterInformation {
                label: ParameterLabel::Simple(param.to_string()),
                documentation: Some(Documentation::String(param_doc.to_string())),
            }]),
            active_parameter: None,
        }],
        active_signature: Some(0),
        active_parameter: Some(0),
    }
}

/// Signature help when the cursor sits inside a known builtin call.
pub fn signature_for_line_prefix(prefix: &str) -> Option<SignatureHelp> {
    if prefix.contains("Console.WriteLine(") {
        return Some(signature(
            "Console.WriteLine(text: string): void",
            "Writes a line of text to the console output",
            "text: string",
            "The text to write",
        ));
    }
    if prefix.contains("Console.Write(") {
        return Some(signature(
            "Console.Write(text: string): void",
            "Writes text to the console output",
            "text: string",
            "The text to write",
        ));
    }
    None
}
