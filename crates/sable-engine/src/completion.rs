//! Code completion over the last published snapshot.
//!
//! Candidates depend on the text in front of the identifier being completed.
//! After `expr.` they are the members of the receiver's type, or the
//! subpackages and types of a package. Inside `import` and `package`
//! statements they are package segments. Everywhere else they are keywords
//! valid in the syntactic context at the cursor, members of the enclosing
//! types, and every project and classpath type. They are filtered with the
//! fuzzy matcher and sorted by prefix closeness first, fuzzy score second.

use sable_core::{is_java_identifier_part, is_java_identifier_start, SmolStr, TextSize};
use sable_fuzzy::{prefix_weight, FuzzyMatcher};
use sable_index::{IndexSnapshot, Symbol, SymbolKind};
use sable_syntax::{innermost_scope, ClasspathContext, ClasspathIndex, Scope, ScopeKind, TypeLookup};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

pub(crate) const MAX_COMPLETIONS: usize = 200;

/// Where the cursor sits, as far as keywords are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionContext {
    TopLevel,
    ClassBody,
    CodeBlock,
}

impl CompletionContext {
    pub fn at(scopes: &[Scope], offset: TextSize) -> Self {
        match innermost_scope(scopes, offset).map(|scope| scope.kind) {
            None => CompletionContext::TopLevel,
            Some(ScopeKind::TypeBody) => CompletionContext::ClassBody,
            Some(ScopeKind::Block) => CompletionContext::CodeBlock,
        }
    }

    /// Keywords offered in this context. `package` is added separately for
    /// files that do not declare one yet.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            CompletionContext::TopLevel => &[
                "import",
                "public",
                "class",
                "interface",
                "enum",
                "record",
            ],
            CompletionContext::ClassBody => &[
                "public",
                "protected",
                "private",
                "static",
                "final",
                "abstract",
                "class",
                "interface",
                "enum",
                "record",
                "void",
            ],
            CompletionContext::CodeBlock => &[
                "if", "for", "while", "do", "switch", "try", "return", "throw", "break",
                "continue", "new", "this", "super", "null", "true", "false", "final", "var",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompletionKind {
    Field,
    EnumConstant,
    Method,
    Type,
    Package,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionItem {
    pub label: SmolStr,
    pub kind: CompletionKind,
    /// Fully qualified name for types, signature for members.
    pub detail: Option<SmolStr>,
    /// Fuzzy score of `label` against the prefix.
    pub score: i64,
}

pub(crate) struct CompletionRequest<'a> {
    pub snapshot: &'a IndexSnapshot,
    pub classpath: &'a ClasspathIndex,
    pub path: &'a Path,
    pub offset: TextSize,
    pub prefix: &'a str,
    /// Current text of `path`, when the registry has it.
    pub text: Option<&'a str>,
}

type Raw = (SmolStr, CompletionKind, Option<SmolStr>);

struct Candidate {
    item: CompletionItem,
    weight: i32,
}

pub(crate) fn complete(request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
    let site = request.text.map_or(Site::Free, |text| {
        Site::classify(text, usize::from(request.offset), request.prefix)
    });
    let raw = match &site {
        Site::Free => free_candidates(request),
        Site::Statement { parent, types } => package_candidates(request, parent, *types),
        Site::Select { head, chain } => select_candidates(request, head, chain),
    };
    rank(raw, request.prefix)
}

/// What the text in front of the completed identifier asks for.
#[derive(Debug, PartialEq, Eq)]
enum Site<'t> {
    Free,
    /// Inside `import a.b.` (`types`) or `package a.`.
    Statement { parent: String, types: bool },
    /// After `chain.`; `head` is the text before the dot.
    Select { head: &'t str, chain: &'t str },
}

impl<'t> Site<'t> {
    fn classify(text: &'t str, offset: usize, prefix: &str) -> Self {
        let mut end = offset.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let head = &text[..end];
        let head = head.strip_suffix(prefix).unwrap_or(head);

        let statement_start = head.rfind([';', '{', '}']).map_or(0, |idx| idx + 1);
        let statement = head[statement_start..].trim_start();
        for (keyword, types) in [("import", true), ("package", false)] {
            let Some(rest) = statement.strip_prefix(keyword) else {
                continue;
            };
            if !rest.starts_with(char::is_whitespace) {
                continue;
            }
            let rest = rest.trim_start();
            let rest = match rest.strip_prefix("static") {
                Some(after) if types && after.starts_with(char::is_whitespace) => after,
                _ => rest,
            };
            let path: String = rest.chars().filter(|ch| !ch.is_whitespace()).collect();
            let parent = path.rsplit_once('.').map_or("", |(parent, _)| parent);
            return Site::Statement {
                parent: parent.to_string(),
                types,
            };
        }

        let trimmed = head.trim_end();
        let Some(before_dot) = trimmed.strip_suffix('.') else {
            return Site::Free;
        };
        let before_dot = before_dot.trim_end();
        let chain_start = before_dot
            .char_indices()
            .rev()
            .take_while(|(_, ch)| is_java_identifier_part(*ch) || *ch == '.')
            .last()
            .map_or(before_dot.len(), |(idx, _)| idx);
        Site::Select {
            head: &before_dot[..chain_start],
            chain: &before_dot[chain_start..],
        }
    }
}

fn free_candidates(request: &CompletionRequest<'_>) -> Vec<Raw> {
    let snapshot = request.snapshot;
    let context = CompletionContext::at(snapshot.scopes(request.path), request.offset);

    let mut raw: Vec<Raw> = Vec::new();

    let has_package = snapshot
        .file(request.path)
        .is_some_and(|entry| entry.symbols.package.is_some());
    if context == CompletionContext::TopLevel && !has_package {
        raw.push(("package".into(), CompletionKind::Keyword, None));
    }
    raw.extend(
        context
            .keywords()
            .iter()
            .map(|keyword| (SmolStr::new(keyword), CompletionKind::Keyword, None)),
    );

    if context != CompletionContext::TopLevel {
        raw.extend(member_candidates(visible_members(
            snapshot,
            request.path,
            request.offset,
        )));
    }

    raw.extend(
        snapshot
            .all_types()
            .map(|symbol| (symbol.name.clone(), CompletionKind::Type, Some(symbol.fqn.clone()))),
    );
    raw.extend(request.classpath.types().map(|fqn| {
        let simple = fqn.rsplit('.').next().unwrap_or(fqn);
        (SmolStr::new(simple), CompletionKind::Type, Some(SmolStr::new(fqn)))
    }));
    raw
}

/// Next package segments below `parent`, plus the types of `parent` itself
/// when `types` is set.
fn package_candidates(request: &CompletionRequest<'_>, parent: &str, types: bool) -> Vec<Raw> {
    let packages = known_packages(request.snapshot, request.classpath);
    let mut raw: Vec<Raw> = packages
        .iter()
        .filter_map(|package| {
            let rest = if parent.is_empty() {
                package.as_str()
            } else {
                package.strip_prefix(parent)?.strip_prefix('.')?
            };
            let segment = rest.split('.').next().filter(|s| !s.is_empty())?;
            let full = if parent.is_empty() {
                segment.to_string()
            } else {
                format!("{parent}.{segment}")
            };
            Some((SmolStr::new(segment), CompletionKind::Package, Some(SmolStr::from(full))))
        })
        .collect();
    if types && !parent.is_empty() {
        raw.extend(types_in_package(request, parent));
    }
    raw
}

fn select_candidates(request: &CompletionRequest<'_>, head: &str, chain: &str) -> Vec<Raw> {
    if chain.is_empty() {
        return Vec::new();
    }
    let Some(owner) = resolve_chain(request, head, chain) else {
        if is_package(request, chain) {
            return package_candidates(request, chain, true);
        }
        return Vec::new();
    };

    let snapshot = request.snapshot;
    let mut raw = member_candidates(members_in_hierarchy(snapshot, vec![owner.clone()]));
    raw.extend(
        snapshot
            .all_types()
            .filter(|symbol| symbol.container.as_deref() == Some(owner.as_str()))
            .map(|symbol| (symbol.name.clone(), CompletionKind::Type, Some(symbol.fqn.clone()))),
    );
    raw
}

fn member_candidates(members: Vec<Symbol>) -> Vec<Raw> {
    members
        .into_iter()
        .filter_map(|member| {
            let kind = match member.kind {
                SymbolKind::Method => CompletionKind::Method,
                SymbolKind::Field => CompletionKind::Field,
                SymbolKind::EnumConstant => CompletionKind::EnumConstant,
                SymbolKind::Constructor | SymbolKind::Type => return None,
            };
            Some((member.name, kind, Some(member.signature)))
        })
        .collect()
}

fn rank(raw: Vec<Raw>, prefix: &str) -> Vec<CompletionItem> {
    let mut seen = HashSet::new();
    let mut matcher = FuzzyMatcher::new(prefix);
    let mut candidates: Vec<Candidate> = raw
        .into_iter()
        .filter(|(label, kind, detail)| seen.insert((label.clone(), *kind, detail.clone())))
        .filter_map(|(label, kind, detail)| {
            let score = matcher.score(&label)?;
            Some(Candidate {
                weight: prefix_weight(prefix, &label),
                item: CompletionItem {
                    label,
                    kind,
                    detail,
                    score: score.value(),
                },
            })
        })
        .collect();

    candidates.sort_by(cmp_candidates);
    candidates.truncate(MAX_COMPLETIONS);
    candidates.into_iter().map(|candidate| candidate.item).collect()
}

fn cmp_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.weight
        .cmp(&a.weight)
        .then_with(|| b.item.score.cmp(&a.item.score))
        .then_with(|| a.item.label.len().cmp(&b.item.label.len()))
        .then_with(|| a.item.label.cmp(&b.item.label))
        .then_with(|| a.item.kind.cmp(&b.item.kind))
        .then_with(|| a.item.detail.cmp(&b.item.detail))
}

/// Innermost project type in `path` whose declaration spans `offset`.
pub(crate) fn enclosing_type<'a>(
    snapshot: &'a IndexSnapshot,
    path: &Path,
    offset: TextSize,
) -> Option<&'a Symbol> {
    snapshot
        .symbols_in_file(path)
        .iter()
        .filter(|symbol| symbol.is_type())
        .filter(|symbol| symbol.range.start() < offset && offset < symbol.range.end())
        .min_by_key(|symbol| symbol.range.len())
}

/// Members of the enclosing type, its outer types and all their project
/// supertypes, nearest first.
fn visible_members(snapshot: &IndexSnapshot, path: &Path, offset: TextSize) -> Vec<Symbol> {
    let Some(enclosing) = enclosing_type(snapshot, path, offset) else {
        return Vec::new();
    };

    let mut owners: Vec<SmolStr> = Vec::new();
    let mut outer = Some(enclosing.fqn.clone());
    while let Some(fqn) = outer {
        outer = snapshot
            .by_fqn(&fqn)
            .into_iter()
            .find(|symbol| symbol.is_type())
            .and_then(|symbol| symbol.container);
        owners.push(fqn);
    }

    members_in_hierarchy(snapshot, owners)
}

/// Members of `owners` and all their project supertypes, breadth first.
fn members_in_hierarchy(snapshot: &IndexSnapshot, owners: Vec<SmolStr>) -> Vec<Symbol> {
    let mut visited: BTreeSet<SmolStr> = BTreeSet::new();
    let mut members = Vec::new();
    let mut pending = owners;
    let mut cursor = 0;
    while cursor < pending.len() {
        let owner = pending[cursor].clone();
        cursor += 1;
        if !visited.insert(owner.clone()) {
            continue;
        }
        members.extend(snapshot.members_of(&owner));
        pending.extend(snapshot.supertypes(&owner));
    }
    members
}

/// Project packages plus the packages of every classpath type.
fn known_packages(snapshot: &IndexSnapshot, classpath: &ClasspathIndex) -> BTreeSet<SmolStr> {
    snapshot
        .packages()
        .map(SmolStr::new)
        .chain(
            classpath
                .types()
                .filter_map(|fqn| fqn.rsplit_once('.'))
                .map(|(package, _)| SmolStr::new(package)),
        )
        .collect()
}

/// Whether `name` is a package or a prefix of one.
fn is_package(request: &CompletionRequest<'_>, name: &str) -> bool {
    known_packages(request.snapshot, request.classpath)
        .iter()
        .any(|package| {
            package == name
                || package
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
}

fn types_in_package(request: &CompletionRequest<'_>, package: &str) -> Vec<Raw> {
    let project = request
        .snapshot
        .types_in_package(package)
        .into_iter()
        .map(|symbol| (symbol.name, CompletionKind::Type, Some(symbol.fqn)));
    let classpath = request
        .classpath
        .types()
        .filter(|fqn| fqn.rsplit_once('.').is_some_and(|(p, _)| p == package))
        .map(|fqn| {
            let simple = fqn.rsplit('.').next().unwrap_or(fqn);
            (SmolStr::new(simple), CompletionKind::Type, Some(SmolStr::new(fqn)))
        });
    project.chain(classpath).collect()
}

/// Type of the expression `chain`: a qualified type name, or a receiver
/// followed by field accesses.
fn resolve_chain(request: &CompletionRequest<'_>, head: &str, chain: &str) -> Option<SmolStr> {
    let segments: Vec<&str> = chain.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    let ctx = ClasspathContext::new(request.snapshot, request.classpath);

    // Longest leading run of segments that names a type.
    let qualified = (2..=segments.len()).rev().find_map(|len| {
        let name = segments[..len].join(".");
        ctx.contains_type(&name).then_some((SmolStr::from(name), len))
    });
    let (mut owner, consumed) = match qualified {
        Some(found) => found,
        None => (receiver_type(request, head, segments[0])?, 1),
    };

    for segment in &segments[consumed..] {
        let field = members_in_hierarchy(request.snapshot, vec![owner.clone()])
            .into_iter()
            .find(|member| member.kind == SymbolKind::Field && member.name == *segment)?;
        owner = field_type(request, &field)?;
    }
    Some(owner)
}

/// Type of the simple receiver `name` at the cursor.
fn receiver_type(request: &CompletionRequest<'_>, head: &str, name: &str) -> Option<SmolStr> {
    let snapshot = request.snapshot;
    let enclosing = enclosing_type(snapshot, request.path, request.offset);
    match name {
        "this" => return enclosing.map(|symbol| symbol.fqn.clone()),
        "super" => return snapshot.supertypes(&enclosing?.fqn).into_iter().next(),
        _ => {}
    }

    if let Some((offset, type_name)) = local_declaration(head, name) {
        let at = TextSize::try_from(offset).ok()?;
        return match snapshot.reference_at(request.path, at) {
            Some(reference) => Some(reference.target.clone()),
            None => resolve_type_name(request, type_name),
        };
    }

    let field = visible_members(snapshot, request.path, request.offset)
        .into_iter()
        .find(|member| member.kind == SymbolKind::Field && member.name == name);
    match field {
        Some(field) => field_type(request, &field),
        None => resolve_type_name(request, name),
    }
}

/// Declared type of a field: the type reference in front of its name, or the
/// type written in its signature.
fn field_type(request: &CompletionRequest<'_>, field: &Symbol) -> Option<SmolStr> {
    let bound = request.snapshot.file(&field.path).and_then(|entry| {
        entry
            .symbols
            .references
            .iter()
            .filter(|reference| {
                field.range.contains_range(reference.range)
                    && reference.range.end() <= field.name_range.start()
            })
            .min_by_key(|reference| reference.range.start())
            .map(|reference| reference.target.clone())
    });
    bound.or_else(|| {
        let (_, written) = field.signature.split_once(": ")?;
        resolve_type_name(request, written)
    })
}

/// Fully qualified name for a type written as `written`, preferring the
/// project, then the current package, then `java.lang`.
fn resolve_type_name(request: &CompletionRequest<'_>, written: &str) -> Option<SmolStr> {
    let name = written.split(['<', '[']).next()?.trim();
    if name.is_empty() {
        return None;
    }
    let ctx = ClasspathContext::new(request.snapshot, request.classpath);
    if name.contains('.') {
        return ctx.contains_type(name).then(|| SmolStr::new(name));
    }

    let package = request
        .snapshot
        .file(request.path)
        .and_then(|entry| entry.symbols.package.clone());
    let project = request.snapshot.types_by_simple_name(name);
    let same_package = project.iter().find(|symbol| {
        symbol.fqn.rsplit_once('.').map(|(p, _)| p) == package.as_deref()
    });
    if let Some(symbol) = same_package.or_else(|| project.first()) {
        return Some(symbol.fqn.clone());
    }

    let lang = format!("java.lang.{name}");
    if request.classpath.contains_type(&lang) {
        return Some(lang.into());
    }
    request
        .classpath
        .types()
        .find(|fqn| fqn.rsplit('.').next() == Some(name))
        .map(SmolStr::new)
}

const NOT_TYPES: &[&str] = &[
    "return", "new", "throw", "case", "else", "instanceof", "yield", "assert",
];

/// Last declaration of the local `name` in `head`, as the offset and text of
/// its declared type.
fn local_declaration<'h>(head: &'h str, name: &str) -> Option<(usize, &'h str)> {
    head.rmatch_indices(name).find_map(|(idx, _)| {
        let after = &head[idx + name.len()..];
        let before = &head[..idx];
        if before.chars().next_back().is_some_and(is_java_identifier_part)
            || after.chars().next().is_some_and(is_java_identifier_part)
        {
            return None;
        }
        if !after
            .trim_start()
            .starts_with(['=', ';', ',', ')', ':'])
        {
            return None;
        }

        let mut ty_end = before.trim_end();
        while let Some(rest) = ty_end.strip_suffix("[]") {
            ty_end = rest.trim_end();
        }
        if ty_end.ends_with('>') {
            let mut depth = 0usize;
            let open = ty_end.char_indices().rev().find_map(|(i, ch)| {
                match ch {
                    '>' => depth += 1,
                    '<' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(i);
                        }
                    }
                    _ => {}
                }
                None
            })?;
            ty_end = ty_end[..open].trim_end();
        }
        let start = ty_end
            .char_indices()
            .rev()
            .take_while(|(_, ch)| is_java_identifier_part(*ch) || *ch == '.')
            .last()
            .map(|(i, _)| i)?;
        let ty = &ty_end[start..];
        let valid = ty.chars().next().is_some_and(is_java_identifier_start)
            && !NOT_TYPES.contains(&ty);
        valid.then_some((start, ty))
    })
}
