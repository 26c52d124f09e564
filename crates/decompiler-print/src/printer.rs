//! C-like text emission over the structured block tree (spec.md §2 last
//! row, §6 "print C ... with markup").
//!
//! Follows the per-op emission dispatch pattern used elsewhere in this
//! workspace for walking an IR and accumulating a value per node: a
//! `match` over the node's operator, walked in a fixed traversal order.
//! Here the "value" built per node is a token stream rather than a
//! codegen value, and the traversal is the structured block tree
//! `decompiler-structure` produces rather than a dataflow graph.

use decompiler_analysis::score_union_fields;
use decompiler_analysis::UnionAccess;
use decompiler_core::{
    Address, Architecture, Datatype, DisplayFormat, Funcdata, Metatype, Opcode, PcodeOp, StructId,
    Symbol, SymbolDirective, TypeId, TypeRegistry, VarnodeId,
};

use crate::error::PrintError;

/// One token of the printed output. Kept distinct from the flattened
/// string so a caller (e.g. a future syntax-highlighting consumer) can
/// walk the stream without re-lexing it.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupToken {
    Keyword(&'static str),
    Ident(String),
    TypeName(String),
    Number(String),
    Punct(&'static str),
    Space,
    Newline,
    Indent,
    Dedent,
}

/// Flattens a markup token stream into plain text, respecting `Indent`/
/// `Dedent` as a running nesting level printed as four spaces per level.
pub fn render_plain(tokens: &[MarkupToken]) -> String {
    let mut out = String::new();
    let mut depth: usize = 0;
    let mut at_line_start = true;
    for tok in tokens {
        match tok {
            MarkupToken::Indent => depth += 1,
            MarkupToken::Dedent => depth = depth.saturating_sub(1),
            MarkupToken::Newline => {
                out.push('\n');
                at_line_start = true;
            }
            MarkupToken::Space => out.push(' '),
            MarkupToken::Keyword(k) => {
                pad_indent(&mut out, &mut at_line_start, depth);
                out.push_str(k);
            }
            MarkupToken::Ident(s) => {
                pad_indent(&mut out, &mut at_line_start, depth);
                out.push_str(s);
            }
            MarkupToken::TypeName(s) => {
                pad_indent(&mut out, &mut at_line_start, depth);
                out.push_str(s);
            }
            MarkupToken::Number(s) => {
                pad_indent(&mut out, &mut at_line_start, depth);
                out.push_str(s);
            }
            MarkupToken::Punct(p) => {
                pad_indent(&mut out, &mut at_line_start, depth);
                out.push_str(p);
            }
        }
    }
    out
}

fn pad_indent(out: &mut String, at_line_start: &mut bool, depth: usize) {
    if *at_line_start {
        for _ in 0..depth {
            out.push_str("    ");
        }
        *at_line_start = false;
    }
}

/// Formats an integer constant per the fixed display-format set of
/// spec.md §6.
pub fn format_integer(value: u64, format: DisplayFormat) -> String {
    match format {
        DisplayFormat::Hex => format!("0x{value:x}"),
        DisplayFormat::Dec => format!("{value}"),
        DisplayFormat::Oct => format!("0{value:o}"),
        DisplayFormat::Bin => format!("0b{value:b}"),
        DisplayFormat::Char => {
            if (0x20..0x7f).contains(&value) {
                format!("'{}'", value as u8 as char)
            } else {
                format!("'\\x{value:02x}'")
            }
        }
    }
}

/// Looks up a symbol's [`SymbolDirective::Convert`] display format, if any.
fn convert_format(symbol: &Symbol) -> Option<DisplayFormat> {
    symbol.directives.iter().find_map(|d| match d {
        SymbolDirective::Convert(fmt) => Some(*fmt),
        _ => None,
    })
}

/// Looks up a symbol's [`SymbolDirective::Equate`] name, if any.
fn equate_name(symbol: &Symbol) -> Option<&str> {
    symbol.directives.iter().find_map(|d| match d {
        SymbolDirective::Equate { name } => Some(name.as_str()),
        _ => None,
    })
}

/// Resolves the symbol (if any) bound to `storage`/`size` in `scope`.
fn resolve_symbol_at<'a>(arch: &'a Architecture, scope: decompiler_core::ScopeId, storage: Address, size: u32) -> Option<&'a Symbol> {
    let scope_node = arch.scopes.scope(scope)?;
    scope_node.symbols().iter().find_map(|sid| {
        let sym = arch.scopes.symbol(*sid)?;
        (sym.storage == storage && sym.size == size).then_some(sym)
    })
}

/// Prints one Varnode operand: a resolved symbol name, a convert/equate
/// directive applied to a constant, or a synthetic `v<offset>` name.
pub fn format_varnode(arch: &Architecture, fd: &Funcdata, vn_id: VarnodeId) -> Result<Vec<MarkupToken>, PrintError> {
    let vn = fd.store.varnode(vn_id)?;
    if let Some(sym) = resolve_symbol_at(arch, fd.local_scope, vn.address, vn.size) {
        if vn.flags.contains(decompiler_core::VarnodeFlags::CONSTANT) {
            if let Some(name) = equate_name(sym) {
                return Ok(vec![MarkupToken::Ident(name.to_string())]);
            }
        }
        let format = convert_format(sym).unwrap_or(DisplayFormat::Dec);
        if vn.flags.contains(decompiler_core::VarnodeFlags::CONSTANT) {
            return Ok(vec![MarkupToken::Number(format_integer(vn.address.offset, format))]);
        }
        return Ok(vec![MarkupToken::Ident(sym.name.clone())]);
    }

    if vn.flags.contains(decompiler_core::VarnodeFlags::CONSTANT) {
        return Ok(vec![MarkupToken::Number(format_integer(vn.address.offset, DisplayFormat::Hex))]);
    }
    Ok(vec![MarkupToken::Ident(format!("v{:x}_{}", vn.address.offset, vn.size))])
}

/// Appends `.facet` to `tokens` when `vn`'s type resolves (via
/// `ScoreUnionFields`) to a specific field rather than the whole union.
fn append_union_facet(
    tokens: &mut Vec<MarkupToken>,
    registry: &TypeRegistry,
    fd: &Funcdata,
    vn_id: VarnodeId,
    op: &PcodeOp,
    slot: i32,
) -> Result<(), PrintError> {
    let vn = fd.store.varnode(vn_id)?;
    let ty = match registry.get(vn.datatype) {
        Some(ty) => ty,
        None => return Ok(()),
    };
    if !matches!(ty.metatype(), Metatype::Union) {
        return Ok(());
    }
    let resolved = score_union_fields(fd, registry, vn.datatype, UnionAccess { op: op.id, slot })?;
    if resolved.field_num < 0 {
        return Ok(());
    }
    if let Datatype::Union { fields, .. } = ty {
        if let Some((name, _)) = fields.iter().nth(resolved.field_num as usize) {
            tokens.push(MarkupToken::Punct("."));
            tokens.push(MarkupToken::Ident(name.clone()));
        }
    }
    Ok(())
}

/// The infix/mnemonic spelling used to print an opcode. Opcodes with a
/// natural infix form print as `lhs OP rhs`; everything else prints as
/// `MNEMONIC(args)`.
fn infix_symbol(op: Opcode) -> Option<&'static str> {
    use Opcode::*;
    Some(match op {
        IntAdd | FloatAdd => "+",
        IntSub | FloatSub => "-",
        IntMult | FloatMult => "*",
        IntDiv | IntSDiv | FloatDiv => "/",
        IntRem | IntSRem => "%",
        IntAnd | BoolAnd => "&",
        IntOr | BoolOr => "|",
        IntXor | BoolXor => "^",
        IntLeft => "<<",
        IntRight | IntSRight => ">>",
        IntEqual | FloatEqual => "==",
        IntNotEqual | FloatNotEqual => "!=",
        IntLess | IntSLess | FloatLess => "<",
        IntLessEqual | IntSLessEqual | FloatLessEqual => "<=",
        _ => return None,
    })
}

fn mnemonic(op: Opcode) -> &'static str {
    use Opcode::*;
    match op {
        Int2Comp => "-",
        IntNeg | IntNot | BoolNegate => "!",
        FloatNeg => "-",
        FloatAbs => "fabs",
        FloatSqrt => "sqrt",
        FloatNan => "isnan",
        FloatInt2Float => "int2float",
        FloatFloat2Float => "float2float",
        FloatTrunc => "trunc",
        FloatCeil => "ceil",
        FloatFloor => "floor",
        FloatRound => "round",
        IntZext => "zext",
        IntSext => "sext",
        IntCarry => "carry",
        IntSCarry => "scarry",
        IntSBorrow => "sborrow",
        Load => "load",
        Store => "store",
        Branch => "goto",
        CBranch => "if_goto",
        BranchInd => "goto_ind",
        Call => "call",
        CallInd => "call_ind",
        CallOther => "callother",
        Return => "return",
        Copy => "copy",
        SubPiece => "subpiece",
        Piece => "piece",
        Cast => "cast",
        PtrAdd => "ptradd",
        PtrSub => "ptrsub",
        SegmentOp => "segment",
        Multiequal => "phi",
        Indirect => "indirect",
        other => infix_symbol(other).unwrap_or_else(|| {
            tracing::warn!(opcode = ?other, "no mnemonic or infix symbol for opcode, falling back to \"op\"");
            "op"
        }),
    }
}

/// Prints one p-code op as a single statement line: `out = lhs OP rhs;` for
/// infix-able binary ops, `out = MNEMONIC(args);` otherwise.
pub fn format_pcodeop(arch: &Architecture, registry: &TypeRegistry, fd: &Funcdata, op: &PcodeOp) -> Result<Vec<MarkupToken>, PrintError> {
    let mut tokens = Vec::new();
    if let Some(out) = op.output {
        tokens.extend(format_varnode(arch, fd, out)?);
        append_union_facet(&mut tokens, registry, fd, out, op, -1)?;
        tokens.push(MarkupToken::Space);
        tokens.push(MarkupToken::Punct("="));
        tokens.push(MarkupToken::Space);
    }

    if op.inputs.len() == 2 {
        if let Some(sym) = infix_symbol(op.opcode) {
            tokens.extend(format_varnode(arch, fd, op.inputs[0])?);
            append_union_facet(&mut tokens, registry, fd, op.inputs[0], op, 0)?;
            tokens.push(MarkupToken::Space);
            tokens.push(MarkupToken::Punct(sym));
            tokens.push(MarkupToken::Space);
            tokens.extend(format_varnode(arch, fd, op.inputs[1])?);
            append_union_facet(&mut tokens, registry, fd, op.inputs[1], op, 1)?;
            tokens.push(MarkupToken::Punct(";"));
            return Ok(tokens);
        }
    }

    tokens.push(MarkupToken::Keyword(mnemonic(op.opcode)));
    tokens.push(MarkupToken::Punct("("));
    for (i, &input) in op.inputs.iter().enumerate() {
        if i > 0 {
            tokens.push(MarkupToken::Punct(","));
            tokens.push(MarkupToken::Space);
        }
        tokens.extend(format_varnode(arch, fd, input)?);
        append_union_facet(&mut tokens, registry, fd, input, op, i as i32)?;
    }
    tokens.push(MarkupToken::Punct(")"));
    tokens.push(MarkupToken::Punct(";"));
    Ok(tokens)
}

/// Prints every op in a leaf basic block, one statement per line.
fn emit_basic(arch: &Architecture, registry: &TypeRegistry, fd: &Funcdata, block: decompiler_core::BlockId, out: &mut Vec<MarkupToken>) -> Result<(), PrintError> {
    let bb = fd.block(block)?;
    for &op_id in bb.ops() {
        let op = fd.store.op(op_id)?;
        out.extend(format_pcodeop(arch, registry, fd, op)?);
        out.push(MarkupToken::Newline);
    }
    Ok(())
}

/// Recursively emits one structured node and its children.
fn emit_struct(arch: &Architecture, registry: &TypeRegistry, fd: &Funcdata, id: StructId, out: &mut Vec<MarkupToken>) -> Result<(), PrintError> {
    let kind = fd.struct_block(id).ok_or(PrintError::StructNotFound { id })?;
    match kind.clone() {
        decompiler_core::FlowBlockKind::Basic(block) => emit_basic(arch, registry, fd, block, out)?,
        decompiler_core::FlowBlockKind::Copy(inner) | decompiler_core::FlowBlockKind::Goto(inner) => {
            emit_struct(arch, registry, fd, inner, out)?
        }
        decompiler_core::FlowBlockKind::MultiGoto(children) | decompiler_core::FlowBlockKind::List(children) => {
            for child in children {
                emit_struct(arch, registry, fd, child, out)?;
            }
        }
        decompiler_core::FlowBlockKind::If { condition, body } => {
            emit_struct(arch, registry, fd, condition, out)?;
            out.push(MarkupToken::Keyword("if"));
            out.push(MarkupToken::Space);
            out.push(MarkupToken::Punct("{"));
            out.push(MarkupToken::Newline);
            out.push(MarkupToken::Indent);
            emit_struct(arch, registry, fd, body, out)?;
            out.push(MarkupToken::Dedent);
            out.push(MarkupToken::Punct("}"));
            out.push(MarkupToken::Newline);
        }
        decompiler_core::FlowBlockKind::IfElse { condition, then_body, else_body } => {
            emit_struct(arch, registry, fd, condition, out)?;
            out.push(MarkupToken::Keyword("if"));
            out.push(MarkupToken::Space);
            out.push(MarkupToken::Punct("{"));
            out.push(MarkupToken::Newline);
            out.push(MarkupToken::Indent);
            emit_struct(arch, registry, fd, then_body, out)?;
            out.push(MarkupToken::Dedent);
            out.push(MarkupToken::Punct("}"));
            out.push(MarkupToken::Space);
            out.push(MarkupToken::Keyword("else"));
            out.push(MarkupToken::Space);
            out.push(MarkupToken::Punct("{"));
            out.push(MarkupToken::Newline);
            out.push(MarkupToken::Indent);
            emit_struct(arch, registry, fd, else_body, out)?;
            out.push(MarkupToken::Dedent);
            out.push(MarkupToken::Punct("}"));
            out.push(MarkupToken::Newline);
        }
        decompiler_core::FlowBlockKind::WhileDo { header, body } => {
            out.push(MarkupToken::Keyword("while"));
            out.push(MarkupToken::Space);
            out.push(MarkupToken::Punct("{"));
            out.push(MarkupToken::Newline);
            out.push(MarkupToken::Indent);
            emit_struct(arch, registry, fd, header, out)?;
            emit_struct(arch, registry, fd, body, out)?;
            out.push(MarkupToken::Dedent);
            out.push(MarkupToken::Punct("}"));
            out.push(MarkupToken::Newline);
        }
        decompiler_core::FlowBlockKind::DoWhile { body } => {
            out.push(MarkupToken::Keyword("do"));
            out.push(MarkupToken::Space);
            out.push(MarkupToken::Punct("{"));
            out.push(MarkupToken::Newline);
            out.push(MarkupToken::Indent);
            emit_struct(arch, registry, fd, body, out)?;
            out.push(MarkupToken::Dedent);
            out.push(MarkupToken::Punct("}"));
            out.push(MarkupToken::Keyword("while"));
            out.push(MarkupToken::Newline);
        }
        decompiler_core::FlowBlockKind::InfiniteLoop { body } => {
            out.push(MarkupToken::Keyword("loop"));
            out.push(MarkupToken::Space);
            out.push(MarkupToken::Punct("{"));
            out.push(MarkupToken::Newline);
            out.push(MarkupToken::Indent);
            emit_struct(arch, registry, fd, body, out)?;
            out.push(MarkupToken::Dedent);
            out.push(MarkupToken::Punct("}"));
            out.push(MarkupToken::Newline);
        }
        decompiler_core::FlowBlockKind::Switch { header, cases, default } => {
            emit_struct(arch, registry, fd, header, out)?;
            out.push(MarkupToken::Keyword("switch"));
            out.push(MarkupToken::Space);
            out.push(MarkupToken::Punct("{"));
            out.push(MarkupToken::Newline);
            out.push(MarkupToken::Indent);
            for case in cases {
                out.push(MarkupToken::Keyword("case"));
                out.push(MarkupToken::Punct(":"));
                out.push(MarkupToken::Newline);
                emit_struct(arch, registry, fd, case, out)?;
            }
            if let Some(default) = default {
                out.push(MarkupToken::Keyword("default"));
                out.push(MarkupToken::Punct(":"));
                out.push(MarkupToken::Newline);
                emit_struct(arch, registry, fd, default, out)?;
            }
            out.push(MarkupToken::Dedent);
            out.push(MarkupToken::Punct("}"));
            out.push(MarkupToken::Newline);
        }
        decompiler_core::FlowBlockKind::Condition { left, right, .. } => {
            emit_struct(arch, registry, fd, left, out)?;
            emit_struct(arch, registry, fd, right, out)?;
        }
    }
    Ok(())
}

/// Prints a whole function's structured body, or an empty string if it
/// has not been structured yet.
pub fn print_function(arch: &Architecture, registry: &TypeRegistry, fd: &Funcdata) -> Result<String, PrintError> {
    let mut tokens = Vec::new();
    tokens.push(MarkupToken::TypeName(format!("{:?}", registry.get(fd.prototype_return).map(|t| t.metatype()).unwrap_or(Metatype::Unknown))));
    tokens.push(MarkupToken::Space);
    tokens.push(MarkupToken::Ident(fd.name.clone()));
    tokens.push(MarkupToken::Punct("("));
    tokens.push(MarkupToken::Punct(")"));
    tokens.push(MarkupToken::Space);
    tokens.push(MarkupToken::Punct("{"));
    tokens.push(MarkupToken::Newline);
    tokens.push(MarkupToken::Indent);
    if let Some(root) = fd.structured_root() {
        emit_struct(arch, registry, fd, root, &mut tokens)?;
    }
    tokens.push(MarkupToken::Dedent);
    tokens.push(MarkupToken::Punct("}"));
    tokens.push(MarkupToken::Newline);
    Ok(render_plain(&tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::{ArchitectureConfig, BasicBlock, FlowBlockKind, Opcode, SpaceId, TypeId};

    fn addr(space: SpaceId, off: u64) -> Address {
        Address::new(space, off)
    }

    fn sample_arch_and_fd() -> (Architecture, Funcdata) {
        let mut arch = Architecture::new(ArchitectureConfig::default());
        let fid = arch.add_function("add_one", addr(arch.unique_space(), 0x1000), 16);
        let mut fd = arch.function(fid).unwrap().clone();

        let b0 = fd.add_block(BasicBlock::new());
        let a = fd.store.new_input_varnode(addr(SpaceId(5), 0), 4, TypeId::INT4);
        let one = fd.store.new_constant_varnode(1, 4, TypeId::INT4);
        let out = fd.store.new_free_varnode(addr(SpaceId(5), 4), 4, TypeId::INT4);

        let op = fd.store.new_op(2, Opcode::IntAdd, b0, addr(SpaceId(5), 0x1000));
        fd.store.op_set_input(op, a, 0).unwrap();
        fd.store.op_set_input(op, one, 1).unwrap();
        fd.store.op_set_output(op, out).unwrap();
        fd.block_mut(b0).unwrap().push_op(op);

        let root = fd.add_struct_block(FlowBlockKind::Basic(b0));
        fd.set_structured_root(root);
        (arch, fd)
    }

    #[test]
    fn format_integer_hex_dec_oct_bin_char() {
        assert_eq!(format_integer(255, DisplayFormat::Hex), "0xff");
        assert_eq!(format_integer(255, DisplayFormat::Dec), "255");
        assert_eq!(format_integer(8, DisplayFormat::Oct), "010");
        assert_eq!(format_integer(5, DisplayFormat::Bin), "0b101");
        assert_eq!(format_integer(65, DisplayFormat::Char), "'A'");
    }

    #[test]
    fn print_function_emits_infix_add_statement() {
        let (arch, fd) = sample_arch_and_fd();
        let registry = TypeRegistry::new();
        let text = print_function(&arch, &registry, &fd).unwrap();
        assert!(text.contains("add_one"));
        assert!(text.contains("+"));
        assert!(text.contains(";"));
    }

    #[test]
    fn render_plain_indents_nested_blocks() {
        let tokens = vec![
            MarkupToken::Keyword("if"),
            MarkupToken::Newline,
            MarkupToken::Indent,
            MarkupToken::Ident("x".to_string()),
            MarkupToken::Newline,
            MarkupToken::Dedent,
        ];
        let text = render_plain(&tokens);
        assert_eq!(text, "if\n    x\n");
    }
}
