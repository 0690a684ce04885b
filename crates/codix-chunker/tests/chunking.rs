use std::path::Path;

use codix_chunker::fallback::line_chunk;
use codix_chunker::{
    BlockKind, Chunker, ChunkerConfig, ChunkingRequest, CodeBlock, FallbackConfig, FallbackReason,
    Lang, Limits, Strategy as Mode,
};
use proptest::prelude::*;

fn rust_fn(name: &str) -> String {
    format!("fn {name}() -> usize {{\n    let label = \"{name}\";\n    label.len()\n}}\n")
}

fn total_lines(content: &str) -> usize {
    if content.is_empty() {
        return 0;
    }
    content.split('\n').count() - usize::from(content.ends_with('\n'))
}

fn lines_of(content: &str, start: usize, end: usize) -> String {
    content
        .split('\n')
        .skip(start - 1)
        .take(end - start + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

fn assert_verbatim(content: &str, blocks: &[CodeBlock]) {
    let total = total_lines(content);
    for b in blocks {
        assert!(1 <= b.start_line && b.start_line <= b.end_line && b.end_line <= total);
        assert_eq!(b.text, lines_of(content, b.start_line, b.end_line));
    }
}

#[cfg(feature = "lang-rust")]
#[test]
fn two_functions_become_two_blocks() {
    let src = "fn total(values: &[u32]) -> u32 {\n    values.iter().copied().sum() }\n\nfn largest(values: &[u32]) -> u32 {\n    values.iter().copied().max().unwrap_or(0) }\n";
    let limits = Limits {
        max_functions_per_file: 10,
        ..Limits::default()
    };
    let mut chunker = Chunker::default();
    let out = chunker.chunk(&ChunkingRequest::new(Path::new("src/math.rs"), src.as_bytes()).with_limits(limits));

    assert_eq!(out.strategy_used, Mode::Ast);
    assert_eq!(out.fallback_reason, None);
    let spans: Vec<_> = out
        .blocks
        .iter()
        .map(|b| (b.kind, b.start_line, b.end_line))
        .collect();
    assert_eq!(
        spans,
        vec![(BlockKind::Function, 1, 2), (BlockKind::Function, 4, 5)]
    );
    assert_verbatim(src, &out.blocks);
}

#[test]
fn oversized_file_never_touches_a_parser() {
    let line = "let x = 1;\n";
    let src = line.repeat(600_000 / line.len() + 1);
    assert!(src.len() >= 600_000);
    let limits = Limits {
        max_file_size_bytes: 524_288,
        ..Limits::default()
    };
    let mut chunker = Chunker::default();
    let out = chunker.chunk(&ChunkingRequest::new(Path::new("src/big.rs"), src.as_bytes()).with_limits(limits));

    assert_eq!(out.strategy_used, Mode::Line);
    assert_eq!(out.fallback_reason, Some(FallbackReason::FileTooLarge));
    assert_eq!(chunker.resources().construction_attempts(), 0);
    assert_eq!(chunker.resources().live_count(), 0);
    assert_eq!(out.blocks.len(), limits.max_blocks_per_file);
    assert_eq!(out.blocks[0].start_line, 1);
    assert_verbatim(&src, &out.blocks);
}

#[cfg(feature = "lang-rust")]
#[test]
fn function_cap_keeps_first_in_source_order() {
    let src: String = (0..120).map(|i| rust_fn(&format!("f{i:03}"))).collect();
    let limits = Limits {
        max_functions_per_file: 50,
        max_blocks_per_file: 100,
        ..Limits::default()
    };
    let mut chunker = Chunker::default();
    let out = chunker.chunk(&ChunkingRequest::new(Path::new("src/many.rs"), src.as_bytes()).with_limits(limits));

    assert_eq!(out.strategy_used, Mode::Ast);
    assert_eq!(out.blocks.len(), 50);
    for (i, block) in out.blocks.iter().enumerate() {
        assert_eq!(block.kind, BlockKind::Function);
        assert_eq!(block.name.as_deref(), Some(format!("f{i:03}").as_str()));
        assert_eq!(block.start_line, i * 4 + 1);
    }
}

#[test]
fn grammarless_language_matches_line_chunker() {
    let src = "def greet(name)\n  puts \"hello #{name}\"\nend\n\nclass Greeter\n  def initialize(name)\n    @name = name\n  end\nend\n";
    let mut chunker = Chunker::default();
    let out = chunker.chunk(&ChunkingRequest::new(Path::new("lib/greeter.rb"), src.as_bytes()));

    assert_eq!(out.language, Some(Lang::Ruby));
    assert_eq!(out.strategy_used, Mode::Line);
    assert_eq!(out.fallback_reason, Some(FallbackReason::ResourceUnavailable));
    assert_eq!(
        out.blocks,
        line_chunk("lib/greeter.rb", src, &Limits::default(), &FallbackConfig::default())
    );
}

#[test]
fn empty_file_yields_no_blocks() {
    let mut chunker = Chunker::default();
    for path in ["src/empty.rs", "empty.txt", "empty.yaml"] {
        let out = chunker.chunk(&ChunkingRequest::new(Path::new(path), b""));
        assert!(out.blocks.is_empty(), "{path}");
        assert!(!out.is_failure());
    }
}

#[cfg(feature = "lang-python")]
#[test]
fn python_methods_and_classes() {
    let src = "class Store:\n    def __init__(self, items):\n        self.items = list(items)\n\n    def total(self):\n        return sum(item.price for item in self.items)\n";
    let mut chunker = Chunker::default();
    let out = chunker.chunk(&ChunkingRequest::new(Path::new("shop/store.py"), src.as_bytes()));

    assert_eq!(out.strategy_used, Mode::Ast);
    let kinds: Vec<_> = out.blocks.iter().map(|b| b.kind).collect();
    assert_eq!(kinds[0], BlockKind::Class);
    assert_eq!(out.blocks[0].name.as_deref(), Some("Store"));
    assert!(out.blocks.iter().any(|b| b.name.as_deref() == Some("total")));
    assert_verbatim(src, &out.blocks);
}

#[cfg(feature = "lang-python")]
#[test]
fn shebang_script_without_extension_uses_ast() {
    let src = "#!/usr/bin/env python3\n\ndef main(argv):\n    for arg in argv:\n        print(arg.upper())\n";
    let mut chunker = Chunker::default();
    let out = chunker.chunk(&ChunkingRequest::new(Path::new("bin/shout"), src.as_bytes()));
    assert_eq!(out.language, Some(Lang::Python));
    assert_eq!(out.strategy_used, Mode::Ast);
    assert_eq!(out.blocks[0].start_line, 3);
}

#[cfg(feature = "lang-rust")]
#[test]
fn impl_blocks_respect_their_own_cap() {
    let src: String = (0..4)
        .map(|i| format!("impl Widget{i} {{\n    fn describe(&self) -> &'static str {{ \"widget number {i}\" }}\n}}\n"))
        .collect();
    let limits = Limits {
        max_impl_blocks_per_file: 2,
        ..Limits::default()
    };
    let mut chunker = Chunker::default();
    let out = chunker.chunk(&ChunkingRequest::new(Path::new("src/w.rs"), src.as_bytes()).with_limits(limits));
    let impls = out.blocks.iter().filter(|b| b.kind == BlockKind::Impl).count();
    assert_eq!(impls, 2);
    assert_eq!(out.blocks[0].name.as_deref(), Some("Widget0"));
}

#[cfg(feature = "lang-config")]
#[test]
fn markdown_sections_use_generic_extraction() {
    let src = "# Intro\n\nThis project chunks source files into semantic blocks.\n\n# Usage\n\nRun the indexer against a directory to produce JSON lines.\n";
    let mut chunker = Chunker::default();
    let out = chunker.chunk(&ChunkingRequest::new(Path::new("docs/guide.md"), src.as_bytes()));
    assert_eq!(out.strategy_used, Mode::Ast);
    assert!(out.blocks.iter().all(|b| b.kind == BlockKind::Module));
    assert_verbatim(src, &out.blocks);
}

fn rust_source() -> impl Strategy<Value = String> {
    let item = prop_oneof![
        "[a-z]{1,8}".prop_map(|n| rust_fn(&n)),
        "[A-Z][a-z]{1,8}".prop_map(|n| format!(
            "struct {n} {{\n    id: u64,\n    label: String,\n    tags: Vec<String>,\n}}\n"
        )),
        "[A-Z][a-z]{1,8}".prop_map(|n| format!(
            "impl {n} {{\n    fn id(&self) -> u64 {{\n        self.id.wrapping_mul(31)\n    }}\n}}\n"
        )),
        "[a-z ;=0-9]{0,40}".prop_map(|s| format!("{s}\n")),
        Just("\n".to_owned()),
    ];
    proptest::collection::vec(item, 0..40).prop_map(|items| items.concat())
}

fn limits_strategy() -> impl Strategy<Value = Limits> {
    (1usize..30, 0usize..10, 0usize..10, 0usize..10, 0usize..80).prop_map(
        |(blocks, functions, classes, impls, min_chars)| Limits {
            max_blocks_per_file: blocks,
            max_functions_per_file: functions,
            max_classes_per_file: classes,
            max_impl_blocks_per_file: impls,
            min_block_chars: min_chars,
            ..Limits::default()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ast_output_is_bounded_and_verbatim(src in rust_source(), limits in limits_strategy()) {
        let mut chunker = Chunker::default();
        let req = ChunkingRequest::new(Path::new("src/gen.rs"), src.as_bytes()).with_limits(limits);
        let out = chunker.chunk(&req);
        assert_verbatim(&src, &out.blocks);
        prop_assert!(out.blocks.len() <= limits.max_blocks_per_file);
        if out.strategy_used == Mode::Ast {
            let count = |pred: fn(BlockKind) -> bool| out.blocks.iter().filter(|b| pred(b.kind)).count();
            prop_assert!(count(BlockKind::is_function_like) <= limits.max_functions_per_file);
            prop_assert!(count(|k| k == BlockKind::Class) <= limits.max_classes_per_file);
            prop_assert!(count(|k| k == BlockKind::Impl) <= limits.max_impl_blocks_per_file);
            prop_assert!(out.blocks.windows(2).all(|w| w[0].start_line <= w[1].start_line));
        }
    }

    #[test]
    fn chunking_is_idempotent(src in rust_source(), limits in limits_strategy()) {
        let req = ChunkingRequest::new(Path::new("src/gen.rs"), src.as_bytes()).with_limits(limits);
        let mut first = Chunker::default();
        let mut second = Chunker::default();
        let a = first.chunk(&req);
        let b = first.chunk(&req);
        let c = second.chunk(&req);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(&a, &c);
    }

    #[test]
    fn unsupported_files_equal_line_chunker(src in "[\\PC\n]{0,1500}", min_chars in 0usize..100) {
        let limits = Limits { min_block_chars: min_chars, ..Limits::default() };
        let mut chunker = Chunker::default();
        let out = chunker.chunk(&ChunkingRequest::new(Path::new("notes.unknown"), src.as_bytes()).with_limits(limits));
        prop_assert_eq!(out.fallback_reason, Some(FallbackReason::UnsupportedLanguage));
        prop_assert_eq!(out.blocks, line_chunk("notes.unknown", &src, &limits, &FallbackConfig::default()));
    }

    #[test]
    fn arbitrary_text_never_breaks_invariants(src in "[\\PC\n]{0,2000}", max_blocks in 1usize..8) {
        let limits = Limits { max_blocks_per_file: max_blocks, min_block_chars: 0, ..Limits::default() };
        let fallback = FallbackConfig { line_max_chars: 40, token_chunk_size: 16, token_chunk_overlap: 4 };
        let mut chunker = Chunker::new(ChunkerConfig { fallback, ..ChunkerConfig::default() });
        for path in ["a.rs", "a.py", "a.ts", "a.go", "a.json", "a.md", "a.txt"] {
            for mode in [Mode::Ast, Mode::Line, Mode::Token] {
                let req = ChunkingRequest::new(Path::new(path), src.as_bytes())
                    .with_limits(limits)
                    .with_strategy(mode);
                let out = chunker.chunk(&req);
                assert_verbatim(&src, &out.blocks);
                prop_assert!(out.blocks.len() <= max_blocks, "{} {}: {}", path, mode, out.blocks.len());
            }
        }
    }
}
