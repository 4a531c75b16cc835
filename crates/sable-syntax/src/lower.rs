//! Lowering from the tree-sitter CST to [`SyntaxUnit`].

use crate::tree::{compact_text, find_named_child, has_child_kind, node_text, range_of};
use crate::unit::{
    CallSite, Import, MemberDecl, MemberKind, Scope, ScopeKind, SyntaxUnit, TypeDecl, TypeKind,
    TypeRef,
};
use sable_core::{SmolStr, TextRange};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, Default)]
struct Ctx {
    /// Innermost type declaration around the current node.
    enclosing: Option<usize>,
    /// Type whose body the current node sits in directly, if any.
    member_owner: Option<usize>,
    in_block: bool,
}

pub(crate) fn lower(unit: &mut SyntaxUnit, source: &str, root: Node<'_>) {
    let mut lowerer = Lowerer { source, unit };
    lowerer.walk(root, Ctx::default());
}

struct Lowerer<'s, 'u> {
    source: &'s str,
    unit: &'u mut SyntaxUnit,
}

fn type_kind(kind: &str) -> Option<TypeKind> {
    Some(match kind {
        "class_declaration" => TypeKind::Class,
        "interface_declaration" => TypeKind::Interface,
        "enum_declaration" => TypeKind::Enum,
        "record_declaration" => TypeKind::Record,
        "annotation_type_declaration" => TypeKind::Annotation,
        _ => return None,
    })
}

fn is_body(kind: &str) -> bool {
    matches!(
        kind,
        "class_body" | "interface_body" | "enum_body" | "annotation_type_body"
    )
}

impl Lowerer<'_, '_> {
    fn text(&self, node: Node<'_>) -> &str {
        node_text(self.source, node)
    }

    fn walk(&mut self, node: Node<'_>, ctx: Ctx) {
        let kind = node.kind();
        if let Some(type_kind) = type_kind(kind) {
            self.lower_type(node, type_kind, ctx);
            return;
        }

        match kind {
            "package_declaration" => {
                if let Some(name) = find_named_child(node, &["identifier", "scoped_identifier"]) {
                    let package: String = self.text(name).split_whitespace().collect();
                    self.unit.package = Some(package.into());
                }
            }
            "import_declaration" => self.lower_import(node),
            "method_declaration" => self.lower_callable(node, MemberKind::Method, ctx),
            "constructor_declaration" | "compact_constructor_declaration" => {
                self.lower_callable(node, MemberKind::Constructor, ctx)
            }
            "field_declaration" | "constant_declaration" => self.lower_field(node, ctx),
            "annotation_type_element_declaration" => self.lower_annotation_element(node, ctx),
            "enum_constant" => self.lower_enum_constant(node, ctx),
            "block" | "constructor_body" => {
                self.push_scope(ScopeKind::Block, node);
                let inner = Ctx {
                    member_owner: None,
                    in_block: true,
                    ..ctx
                };
                self.walk_children(node, inner);
            }
            // Anonymous class bodies and enum constant bodies.
            kind if is_body(kind) => {
                let inner = Ctx {
                    member_owner: None,
                    ..ctx
                };
                self.walk_body(node, inner);
            }
            "type_identifier" => {
                let name = SmolStr::new(self.text(node));
                self.push_ref(name, node, ctx);
            }
            "scoped_type_identifier" => {
                if let Some(name) = self.type_name(node) {
                    self.push_ref(name.into(), node, ctx);
                }
                self.walk_type_arguments(node, ctx);
            }
            "type_parameters" => self.lower_type_params(node, range_of(node), None, ctx),
            "method_invocation" => self.lower_call(node, ctx),
            _ => self.walk_children(node, ctx),
        }
    }

    fn walk_children(&mut self, node: Node<'_>, ctx: Ctx) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, ctx);
        }
    }

    fn walk_body(&mut self, body: Node<'_>, ctx: Ctx) {
        self.push_scope(ScopeKind::TypeBody, body);
        self.walk_children(body, ctx);
    }

    fn push_scope(&mut self, kind: ScopeKind, node: Node<'_>) {
        self.unit.scopes.push(Scope {
            kind,
            range: range_of(node),
        });
    }

    fn push_ref(&mut self, name: SmolStr, node: Node<'_>, ctx: Ctx) {
        if name.is_empty() {
            return;
        }
        self.unit.type_refs.push(TypeRef {
            name,
            range: range_of(node),
            enclosing: ctx.enclosing,
        });
    }

    fn modifiers(&self, node: Node<'_>) -> Vec<SmolStr> {
        let Some(modifiers) = find_named_child(node, &["modifiers"]) else {
            return Vec::new();
        };
        let mut cursor = modifiers.walk();
        let keywords = modifiers
            .children(&mut cursor)
            .filter(|child| !child.is_named())
            .map(|child| SmolStr::new(self.text(child)))
            .collect();
        keywords
    }

    fn lower_type(&mut self, node: Node<'_>, kind: TypeKind, ctx: Ctx) {
        let Some(name_node) = node.child_by_field_name("name") else {
            self.walk_children(node, ctx);
            return;
        };
        let name = SmolStr::new(self.text(name_node));
        let parent = ctx.enclosing;
        let is_local = ctx.in_block || parent.is_some_and(|p| self.unit.types[p].is_local);
        let fqn: SmolStr = match parent {
            Some(p) => format!("{}.{name}", self.unit.types[p].fqn).into(),
            None => self.unit.qualify(&name).into(),
        };

        let index = self.unit.types.len();
        self.unit.types.push(TypeDecl {
            name,
            fqn,
            kind,
            range: range_of(node),
            name_range: range_of(name_node),
            parent,
            is_local,
            modifiers: self.modifiers(node),
            type_params: Vec::new(),
            supertypes: Vec::new(),
            members: Vec::new(),
        });

        let inner = Ctx {
            enclosing: Some(index),
            member_owner: Some(index),
            in_block: false,
        };
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                _ if child.id() == name_node.id() => {}
                "modifiers" => {}
                "type_parameters" => {
                    self.lower_type_params(child, range_of(node), Some(index), ctx)
                }
                "superclass" | "super_interfaces" | "extends_interfaces" => {
                    self.lower_supertypes(child, index, ctx)
                }
                "formal_parameters" => self.lower_record_components(child, index, inner),
                kind if is_body(kind) => self.walk_body(child, inner),
                _ => self.walk(child, inner),
            }
        }
    }

    fn lower_type_params(
        &mut self,
        node: Node<'_>,
        scope: TextRange,
        owner: Option<usize>,
        ctx: Ctx,
    ) {
        let mut cursor = node.walk();
        for param in node.named_children(&mut cursor) {
            if param.kind() != "type_parameter" {
                continue;
            }
            let name = find_named_child(param, &["type_identifier", "identifier"]);
            if let Some(name) = name {
                let name = SmolStr::new(self.text(name));
                if let Some(owner) = owner {
                    self.unit.types[owner].type_params.push(name.clone());
                }
                self.unit.type_params.push((scope, name));
            }
            let mut inner_cursor = param.walk();
            for child in param.named_children(&mut inner_cursor) {
                if Some(child.id()) != name.map(|n| n.id()) {
                    self.walk(child, ctx);
                }
            }
        }
    }

    /// Records the first reference produced by each listed supertype.
    fn lower_supertypes(&mut self, clause: Node<'_>, owner: usize, ctx: Ctx) {
        let mut types = Vec::new();
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            if child.kind() == "type_list" {
                let mut list_cursor = child.walk();
                types.extend(child.named_children(&mut list_cursor));
            } else {
                types.push(child);
            }
        }

        for ty in types {
            let before = self.unit.type_refs.len();
            self.walk(ty, ctx);
            if self.unit.type_refs.len() > before {
                self.unit.types[owner].supertypes.push(before);
            }
        }
    }

    fn lower_record_components(&mut self, params: Node<'_>, owner: usize, ctx: Ctx) {
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            if param.kind() != "formal_parameter" {
                self.walk(param, ctx);
                continue;
            }
            let name = param.child_by_field_name("name");
            let ty = param.child_by_field_name("type");
            if let Some(name) = name {
                let name_text = SmolStr::new(self.text(name));
                let ty_text = ty.map(|t| compact_text(self.source, t)).unwrap_or_default();
                self.unit.types[owner].members.push(MemberDecl {
                    signature: format!("{name_text}: {ty_text}"),
                    name: name_text,
                    kind: MemberKind::Field,
                    range: range_of(param),
                    name_range: range_of(name),
                    modifiers: Vec::new(),
                });
            }
            if let Some(ty) = ty {
                self.walk(ty, ctx);
            }
        }
    }

    fn lower_import(&mut self, node: Node<'_>) {
        let Some(name) = find_named_child(node, &["identifier", "scoped_identifier"]) else {
            return;
        };
        let path: String = self.text(name).split_whitespace().collect();
        self.unit.imports.push(Import {
            path: path.into(),
            is_static: has_child_kind(node, "static"),
            on_demand: has_child_kind(node, "asterisk"),
            range: range_of(node),
        });
    }

    fn parameter_types(&self, node: Node<'_>) -> Vec<String> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut cursor = params.walk();
        let types = params
            .named_children(&mut cursor)
            .filter_map(|param| match param.kind() {
                "formal_parameter" => param
                    .child_by_field_name("type")
                    .map(|ty| compact_text(self.source, ty)),
                "spread_parameter" => {
                    let mut inner = param.walk();
                    let ty = param
                        .named_children(&mut inner)
                        .find(|child| child.kind() != "modifiers")
                        .map(|ty| format!("{}...", compact_text(self.source, ty)));
                    ty
                }
                _ => None,
            })
            .collect();
        types
    }

    fn lower_callable(&mut self, node: Node<'_>, kind: MemberKind, ctx: Ctx) {
        let name_node = node.child_by_field_name("name");
        if let (Some(owner), Some(name_node)) = (ctx.member_owner, name_node) {
            let name = SmolStr::new(self.text(name_node));
            let params = self.parameter_types(node).join(", ");
            let signature = match kind {
                MemberKind::Method => {
                    let ret = node
                        .child_by_field_name("type")
                        .map(|ty| compact_text(self.source, ty))
                        .unwrap_or_else(|| "void".to_string());
                    format!("{name}({params}): {ret}")
                }
                _ => format!("{name}({params})"),
            };
            let modifiers = self.modifiers(node);
            self.unit.types[owner].members.push(MemberDecl {
                name,
                kind,
                range: range_of(node),
                name_range: range_of(name_node),
                signature,
                modifiers,
            });
        }

        let inner = Ctx {
            member_owner: None,
            ..ctx
        };
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if Some(child.id()) == name_node.map(|n| n.id()) {
                continue;
            }
            match child.kind() {
                "modifiers" => {}
                "type_parameters" => self.lower_type_params(child, range_of(node), None, inner),
                _ => self.walk(child, inner),
            }
        }
    }

    fn lower_field(&mut self, node: Node<'_>, ctx: Ctx) {
        if let Some(owner) = ctx.member_owner {
            let ty = node
                .child_by_field_name("type")
                .map(|ty| compact_text(self.source, ty))
                .unwrap_or_default();
            let modifiers = self.modifiers(node);
            let mut cursor = node.walk();
            let declarators: Vec<_> = node
                .children_by_field_name("declarator", &mut cursor)
                .collect();
            for declarator in declarators {
                let Some(name_node) = declarator.child_by_field_name("name") else {
                    continue;
                };
                let name = SmolStr::new(self.text(name_node));
                self.unit.types[owner].members.push(MemberDecl {
                    signature: format!("{name}: {ty}"),
                    name,
                    kind: MemberKind::Field,
                    range: range_of(node),
                    name_range: range_of(name_node),
                    modifiers: modifiers.clone(),
                });
            }
        }

        let inner = Ctx {
            member_owner: None,
            ..ctx
        };
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "modifiers" {
                self.walk(child, inner);
            }
        }
    }

    fn lower_annotation_element(&mut self, node: Node<'_>, ctx: Ctx) {
        let name_node = node.child_by_field_name("name");
        if let (Some(owner), Some(name_node)) = (ctx.member_owner, name_node) {
            let name = SmolStr::new(self.text(name_node));
            let ty = node
                .child_by_field_name("type")
                .map(|ty| compact_text(self.source, ty))
                .unwrap_or_default();
            let modifiers = self.modifiers(node);
            self.unit.types[owner].members.push(MemberDecl {
                signature: format!("{name}(): {ty}"),
                name,
                kind: MemberKind::Method,
                range: range_of(node),
                name_range: range_of(name_node),
                modifiers,
            });
        }
        if let Some(ty) = node.child_by_field_name("type") {
            let inner = Ctx {
                member_owner: None,
                ..ctx
            };
            self.walk(ty, inner);
        }
    }

    fn lower_enum_constant(&mut self, node: Node<'_>, ctx: Ctx) {
        let name_node = node.child_by_field_name("name");
        if let (Some(owner), Some(name_node)) = (ctx.member_owner, name_node) {
            let name = SmolStr::new(self.text(name_node));
            self.unit.types[owner].members.push(MemberDecl {
                signature: name.to_string(),
                name,
                kind: MemberKind::EnumConstant,
                range: range_of(node),
                name_range: range_of(name_node),
                modifiers: Vec::new(),
            });
        }
        let inner = Ctx {
            member_owner: None,
            ..ctx
        };
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if Some(child.id()) != name_node.map(|n| n.id()) && child.kind() != "modifiers" {
                self.walk(child, inner);
            }
        }
    }

    fn lower_call(&mut self, node: Node<'_>, ctx: Ctx) {
        let name_node = node.child_by_field_name("name");
        if let Some(name_node) = name_node {
            let receiver = node
                .child_by_field_name("object")
                .map(|object| SmolStr::new(compact_text(self.source, object)));
            self.unit.calls.push(CallSite {
                name: SmolStr::new(self.text(name_node)),
                name_range: range_of(name_node),
                receiver,
                enclosing: ctx.enclosing,
            });
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if Some(child.id()) != name_node.map(|n| n.id()) {
                self.walk(child, ctx);
            }
        }
    }

    /// Dotted name of a (possibly scoped or generic) type node.
    fn type_name(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "type_identifier" => Some(self.text(node).to_string()),
            "scoped_type_identifier" => {
                let mut parts = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if matches!(
                        child.kind(),
                        "type_identifier" | "scoped_type_identifier" | "generic_type"
                    ) {
                        parts.push(self.type_name(child)?);
                    }
                }
                (!parts.is_empty()).then(|| parts.join("."))
            }
            "generic_type" => {
                let base = find_named_child(node, &["type_identifier", "scoped_type_identifier"])?;
                self.type_name(base)
            }
            _ => None,
        }
    }

    fn walk_type_arguments(&mut self, node: Node<'_>, ctx: Ctx) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "type_arguments" => self.walk(child, ctx),
                "generic_type" | "scoped_type_identifier" => self.walk_type_arguments(child, ctx),
                _ => {}
            }
        }
    }
}
