//! Tokenizes and assembles MIPS32 Release-6 source text into a running [`mips_core::Cpu`]
//!. The pipeline is the classic two-pass assembler shape: a first pass walks
//! statements in source order, switching segments, emitting data, and reserving (but not yet
//! encoding) one word per instruction statement; a second pass, once every label in the program
//! is known, resolves and encodes those reserved words.

pub mod context;
pub mod directive;
pub mod encode;
pub mod error;
pub mod operand;
pub mod statement;
pub mod symbol;
pub mod token;

use context::{Context, PendingInstruction};
use error::{AssembleError, AssembleWarning};
use mips_core::cpu::Cpu;
use mips_core::isa::pseudo::PseudoOperand;
use mips_core::isa::{Isa, OperandShape};
use operand::ResolvedOperand;
use statement::RawStatement;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use token::{tokenize, SourceLocation, Token, TokenType};

/// What a successful assembly produced besides the program loaded into `cpu.memory`.
#[derive(Debug, Default)]
pub struct AssembleOutcome {
    pub warnings: Vec<AssembleWarning>,
}

/// Assembles the file at `path` (and anything it `.include`s) into `cpu`, ready for [`run`] to
/// execute starting at the user text base.
pub fn assemble_file(cpu: &mut Cpu, path: &Path) -> Result<AssembleOutcome, AssembleError> {
    let mut ctx = Context::new();
    assemble_source(&mut ctx, cpu, path)?;
    apply_globl_requests(&mut ctx);
    let pending = std::mem::take(&mut ctx.pending);
    encode::encode_pending(&ctx, &pending, cpu)?;
    Ok(AssembleOutcome { warnings: ctx.warnings })
}

/// Assembles `text` as a single, in-memory program under the pseudo-filename `name` — the form a
/// CLI `-e` flag or a test harness wants. `.include` inside `text` is still resolved relative to
/// the current working directory, since there is no file on disk to anchor it to.
pub fn assemble_str(cpu: &mut Cpu, name: &str, text: &str) -> Result<AssembleOutcome, AssembleError> {
    let mut ctx = Context::new();
    run_statements_from_text(&mut ctx, cpu, name, text, None)?;
    apply_globl_requests(&mut ctx);
    let pending = std::mem::take(&mut ctx.pending);
    encode::encode_pending(&ctx, &pending, cpu)?;
    Ok(AssembleOutcome { warnings: ctx.warnings })
}

fn apply_globl_requests(ctx: &mut Context) {
    let requests = std::mem::take(&mut ctx.globl_requests);
    for (name, file, location) in requests {
        let taken = ctx.locals.get_mut(file.as_str()).and_then(|t| t.take(&name));
        match taken {
            Some(sym) => {
                if ctx.globals.define(&name, sym.address, sym.defining_location).is_err() {
                    ctx.warnings.push(AssembleWarning {
                        location,
                        message: format!("`.globl {}` ignored: a global symbol by that name already exists", name),
                    });
                }
            }
            None => ctx.warnings.push(AssembleWarning {
                location,
                message: format!("`.globl {}` ignored: no local symbol by that name was defined", name),
            }),
        }
    }
}

fn assemble_source(ctx: &mut Context, cpu: &mut Cpu, path: &Path) -> Result<(), AssembleError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let text = fs::read_to_string(path).map_err(|e| AssembleError::IncludeError {
        location: missing_location(),
        reason: format!("couldn't read {}: {}", path.display(), e),
    })?;
    let dir = path.parent().map(Path::to_path_buf);
    let file_name = path.to_string_lossy().into_owned();
    run_statements_from_text(ctx, cpu, &file_name, &text, Some((canonical, dir)))
}

fn run_statements_from_text(
    ctx: &mut Context,
    cpu: &mut Cpu,
    file_name: &str,
    text: &str,
    include_origin: Option<(PathBuf, Option<PathBuf>)>,
) -> Result<(), AssembleError> {
    if let Some((canonical, _)) = &include_origin {
        if !ctx.include_stack.insert(canonical.clone()) {
            return Err(AssembleError::IncludeError {
                location: missing_location(),
                reason: format!("circular include of {}", canonical.display()),
            });
        }
    }

    let known = |m: &str| cpu.isa().contains(m) || operand::is_pseudo(m);
    let tokens = tokenize(text, file_name, &known);
    let statements = statement::group_statements(&tokens)?;

    let base_dir = include_origin.as_ref().and_then(|(_, dir)| dir.clone());
    for stmt in &statements {
        process_statement(ctx, cpu, file_name, base_dir.as_deref(), stmt)?;
    }

    if let Some((canonical, _)) = &include_origin {
        ctx.include_stack.remove(&canonical);
    }
    Ok(())
}

fn missing_location() -> SourceLocation {
    SourceLocation { file: Rc::new(String::new()), line: 0, line_offset: 0, file_offset: 0 }
}

fn process_statement(
    ctx: &mut Context,
    cpu: &mut Cpu,
    file: &str,
    base_dir: Option<&Path>,
    stmt: &RawStatement,
) -> Result<(), AssembleError> {
    let head = &stmt.tokens[0];
    match head.kind {
        TokenType::Directive => {
            if let Some(label) = &stmt.label {
                directive::define_label(ctx, file, label)?;
            }
            let handled = directive::execute(ctx, cpu, head, &stmt.tokens[1..])?;
            if !handled {
                process_include(ctx, cpu, base_dir, head, &stmt.tokens[1..])?;
            }
            Ok(())
        }
        TokenType::Mnemonic => {
            if let Some(label) = &stmt.label {
                directive::define_label(ctx, file, label)?;
            }
            process_instruction(ctx, cpu, file, head, &stmt.tokens[1..])
        }
        _ => Err(AssembleError::UnexpectedToken {
            location: head.location.clone(),
            got: head.kind,
            expected: "a mnemonic or a directive",
        }),
    }
}

fn process_include(
    ctx: &mut Context,
    cpu: &mut Cpu,
    base_dir: Option<&Path>,
    directive_tok: &Token,
    operand_tokens: &[Token],
) -> Result<(), AssembleError> {
    let tok = operand_tokens.first().ok_or_else(|| AssembleError::SyntaxError {
        location: directive_tok.location.clone(),
        summary: "`.include` expects a string literal path".to_owned(),
    })?;
    let name = match &tok.parsed_value {
        token::ParsedValue::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        _ => {
            return Err(AssembleError::UnexpectedToken {
                location: tok.location.clone(),
                got: tok.kind,
                expected: "a string literal path",
            })
        }
    };
    let resolved = match base_dir {
        Some(dir) => dir.join(&name),
        None => PathBuf::from(&name),
    };
    assemble_source(ctx, cpu, &resolved).map_err(|e| match e {
        AssembleError::IncludeError { reason, .. } => {
            AssembleError::IncludeError { location: directive_tok.location.clone(), reason }
        }
        other => other,
    })
}

fn resolve_register<'a>(cpu: &'a Cpu) -> impl Fn(&Token) -> Option<u32> + 'a {
    move |tok: &Token| {
        let name = tok.raw_text.strip_prefix('$').unwrap_or(&tok.raw_text);
        cpu.gpr.index_of_name(name)
    }
}

fn process_instruction(
    ctx: &mut Context,
    cpu: &mut Cpu,
    file: &str,
    mnemonic_tok: &Token,
    operand_tokens: &[Token],
) -> Result<(), AssembleError> {
    let mnemonic = mnemonic_tok.raw_text.as_str();
    let resolver = resolve_register(cpu);

    if cpu.isa().contains(mnemonic) {
        let (instruction, resolved) = match_basic(cpu.isa(), mnemonic, operand_tokens, &resolver, &mnemonic_tok.location)?;
        let address = ctx.reserve_text_word(&mnemonic_tok.location)?;
        ctx.pending.push(PendingInstruction {
            address,
            file: Rc::new(file.to_owned()),
            instruction,
            operands: resolved,
            location: mnemonic_tok.location.clone(),
        });
        return Ok(());
    }

    if let Some(pseudo) = mips_core::isa::pseudo::by_mnemonic(mnemonic) {
        let shape = operand::pseudo_shape(mnemonic);
        let resolved = operand::parse_operands(operand_tokens, shape, &resolver)?;
        let pseudo_ops: Vec<PseudoOperand> = resolved.iter().map(to_pseudo_operand).collect();
        let expansion = (pseudo.expand)(&pseudo_ops);
        for line in expansion {
            let instruction = *cpu.isa().overloads(line.mnemonic).first().unwrap_or_else(|| {
                panic!("pseudo-instruction `{}` expanded to unregistered mnemonic `{}`", mnemonic, line.mnemonic)
            });
            let operands: Vec<ResolvedOperand> = line.operands.iter().map(from_pseudo_operand).collect();
            let address = ctx.reserve_text_word(&mnemonic_tok.location)?;
            ctx.pending.push(PendingInstruction {
                address,
                file: Rc::new(file.to_owned()),
                instruction,
                operands,
                location: mnemonic_tok.location.clone(),
            });
        }
        return Ok(());
    }

    Err(AssembleError::SyntaxError {
        location: mnemonic_tok.location.clone(),
        summary: format!("unknown mnemonic `{}`", mnemonic),
    })
}

fn to_pseudo_operand(op: &ResolvedOperand) -> PseudoOperand {
    match op {
        ResolvedOperand::Register(n) => PseudoOperand::Register(*n),
        ResolvedOperand::Immediate(v) => PseudoOperand::Immediate(*v),
        ResolvedOperand::Label(s) => PseudoOperand::Label(s.clone()),
    }
}

fn from_pseudo_operand(op: &PseudoOperand) -> ResolvedOperand {
    match op {
        PseudoOperand::Register(n) => ResolvedOperand::Register(*n),
        PseudoOperand::Immediate(v) => ResolvedOperand::Immediate(*v),
        PseudoOperand::Label(s) => ResolvedOperand::Label(s.clone()),
    }
}

/// Tries every overload registered under `mnemonic` in registration order, keeping the first
/// whose [`OperandShape`] the statement's tokens actually match.
fn match_basic(
    isa: &Isa,
    mnemonic: &str,
    tokens: &[Token],
    resolver: &dyn Fn(&Token) -> Option<u32>,
    location: &SourceLocation,
) -> Result<(&'static mips_core::isa::Instruction, Vec<ResolvedOperand>), AssembleError> {
    let overloads = isa.overloads(mnemonic);
    let mut last_err: Option<AssembleError> = None;
    for instr in overloads {
        let shape: OperandShape = instr.operands;
        match operand::parse_operands(tokens, shape, resolver) {
            Ok(resolved) => return Ok((instr, resolved)),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| AssembleError::SyntaxError {
        location: location.clone(),
        summary: format!("no registered overload of `{}` matches these operands", mnemonic),
    }))
}

/// Runs an already-assembled program to completion — a thin convenience wrapper around
/// [`Cpu::run`].
pub fn run(cpu: &mut Cpu) -> (mips_core::ExitReason, Option<i64>) {
    cpu.run()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn assembles_and_runs_addiu_to_completion() {
        let mut cpu = Cpu::new();
        assemble_str(&mut cpu, "t.s", ".text\naddiu $v0, $zero, 10\nli $v0, 10\nsyscall\n").unwrap();
        let (reason, code) = cpu.run();
        assert!(matches!(reason, mips_core::ExitReason::ProgramStopped(mips_core::StopReason::Exit(_))));
        assert_eq!(code, Some(0));
    }

    #[test]
    fn la_expands_lui_ori_pair_and_resolves_data_label() {
        let mut cpu = Cpu::new();
        let src = ".data\nmsg: .asciiz \"hi\"\n.text\nla $a0, msg\nli $v0, 4\nsyscall\nli $v0, 10\nsyscall\n";
        assemble_str(&mut cpu, "t.s", src).unwrap();
        let (reason, code) = cpu.run();
        assert!(matches!(reason, mips_core::ExitReason::ProgramStopped(mips_core::StopReason::Exit(_))));
        assert_eq!(code, Some(0));
    }

    #[test]
    fn undefined_symbol_is_rejected_at_assemble_time() {
        let mut cpu = Cpu::new();
        let err = assemble_str(&mut cpu, "t.s", ".text\nj nowhere\n").unwrap_err();
        assert!(matches!(err, AssembleError::SymbolDoesNotExist { .. }));
    }

    #[test]
    fn duplicate_label_definition_is_rejected() {
        let mut cpu = Cpu::new();
        let err = assemble_str(&mut cpu, "t.s", ".text\nloop: nop\nloop: nop\n").unwrap_err();
        assert!(matches!(err, AssembleError::SymbolAlreadyExists { .. }));
    }

    #[test]
    fn globl_without_matching_local_symbol_is_a_warning_not_an_error() {
        let mut cpu = Cpu::new();
        let outcome = assemble_str(&mut cpu, "t.s", ".globl ghost\n.text\nnop\n").unwrap();
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn branch_to_forward_label_assembles_and_runs() {
        let mut cpu = Cpu::new();
        let src = ".text\nbeq $zero, $zero, done\nli $v0, 10\nsyscall\ndone:\nli $v0, 4\nla $a0, done\nsyscall\nli $v0, 10\nsyscall\n";
        assemble_str(&mut cpu, "t.s", src).unwrap();
        let (reason, _) = cpu.run();
        assert!(matches!(reason, mips_core::ExitReason::ProgramStopped(mips_core::StopReason::Exit(_))));
    }
}
