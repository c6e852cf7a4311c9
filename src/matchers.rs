//! Pattern library for sentence shapes of the proof language.
//!
//! Every recognizer is a literal `Regex` compiled once in `Matchers::new()`
//! and passed around by reference; there is no process-wide registry.
//! `PatternId` is the serde-addressable name a policy file uses to refer to
//! a recognizer.
//!
//! The `regex` crate has no lookaround, so shapes that would want it are
//! written without: token lookaheads are plain `(?:\s+\S+)+` groups (same
//! language under the automaton), and the `Ltac` recognizer uses `[^:]:=`
//! to avoid matching the `::=` override form.

use regex::Regex;
use serde::{Deserialize, Serialize};

// Capture group names shared with `context.rs`.
pub const GROUP_NAME: &str = "name";
pub const GROUP_TRAILER: &str = "trailer";
pub const GROUP_LEMMA_NAME: &str = "lemma_nm";
pub const GROUP_GOAL_STMT: &str = "goal_stmt";

const SPACES: &str = r"\s+";
const MAYBE_SPACES: &str = r"\s*";
const ANYTHING: &str = r"[\s\S]+";
const MAYBE_ANYTHING: &str = r"[\s\S]*";
const NON_SPACES: &str = r"\S+";
// One or more whitespace-separated tokens, leaving the final period for the
// sentence anchor.
const SPACED_STUFF: &str = r"(?:\s+\S+)+";

fn sentence(body: &str) -> String {
    format!(r"^\s*{body}\s*\.$")
}

fn attribute(attr: &str) -> String {
    format!(r"\s*(?:#\[.*{attr}.*\])")
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern failed to compile")
}

/// Stable names for the policy-referable recognizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternId {
    /// Catch-all: any well-formed sentence.
    Any,
    Import,
    ImportNoFrom,
    Export,
    ExportNoFrom,
    Include,
    SetFlag,
    OpenScope,
    CloseScope,
    Derive,
    Definition,
    Fixpoint,
    Inductive,
    Ltac,
    LtacOverrideWithIdtac,
    ImplicitTypes,
    InteractiveInstance,
    DefinedInstance,
    RegisterHints,
    LocalRegisterHints,
    UnregisterHints,
    LocalNotation,
    ContextDecl,
    NamespaceOpen,
    Lemma,
    Goal,
    AnonymousInstance,
    SectionBegin,
    ModuleTypeBegin,
    ModuleBegin,
    NamespaceBegin,
    NestEnd,
    ProofBegin,
    ProofEnd,
    ProofOneliner,
}

/// The compiled pattern library.
pub struct Matchers {
    pub any: Regex,
    pub import: Regex,
    pub import_no_from: Regex,
    pub export: Regex,
    pub export_no_from: Regex,
    pub include: Regex,
    pub set_flag: Regex,
    pub open_scope: Regex,
    pub close_scope: Regex,
    pub derive: Regex,
    pub definition: Regex,
    pub fixpoint: Regex,
    pub inductive: Regex,
    pub ltac: Regex,
    pub ltac_override_with_idtac: Regex,
    pub implicit_types: Regex,
    pub interactive_instance: Regex,
    pub defined_instance: Regex,
    pub register_hints: Regex,
    pub local_register_hints: Regex,
    pub unregister_hints: Regex,
    pub local_notation: Regex,
    pub context_decl: Regex,
    pub namespace_open: Regex,
    pub lemma: Regex,
    pub goal: Regex,
    pub anonymous_instance: Regex,
    pub section_begin: Regex,
    pub module_type_begin: Regex,
    pub module_begin: Regex,
    pub namespace_begin: Regex,
    pub nest_end: Regex,
    pub proof_begin: Regex,
    pub proof_end: Regex,
    pub proof_oneliner: Regex,

    // Internal helpers for classification and context tracking; not
    // addressable from policy files.
    pub(crate) colon_equals: Regex,
    pub(crate) program_search: Regex,
    pub(crate) program_at_start: Regex,
    pub(crate) equations_at_start: Regex,
    pub(crate) next_obligation_at_start: Regex,
    pub(crate) explained_forms: Vec<Regex>,
}

impl Default for Matchers {
    fn default() -> Self {
        Matchers::new()
    }
}

impl Matchers {
    pub fn new() -> Self {
        let local = format!("(?:{}|Local)", attribute("local"));
        let global = format!("(?:{}|Global)", attribute("global"));
        let export_mod = format!("(?:{}|Export)", attribute("export"));
        let maybe_locality = format!("(?:(?:{local}|{global}|{export_mod}){SPACES})?");
        let polymorphic = format!("(?:{}|Polymorphic)", attribute("polymorphic"));
        let maybe_polymorphic = format!("(?:{polymorphic}{SPACES})?");
        let program = format!(
            "(?:{}|(?:{})?{MAYBE_SPACES}Program)",
            attribute("program"),
            attribute(".*")
        );
        let definitely_program = format!("{program}{MAYBE_SPACES}");
        // [#[... only(...) ...]] blocks, used by [derive] clauses.
        let only_something = format!(r"\s*(?:#\[.*only\([\s\S]+\).*\])");

        let require_import = format!(r"(?:Require{SPACES})?Import");
        let require_export = format!(r"(?:Require{SPACES})?Export");
        let definitely_from = format!("From{SPACED_STUFF}{SPACES}");

        let proof_begin_frag =
            format!(r"{MAYBE_SPACES}(?:Next{SPACES}Obligation|Proof)(?:{SPACES}using{SPACED_STUFF})?");
        let proof_end_frag =
            format!(r"{MAYBE_SPACES}(?:Qed|Admitted|Abort|Defined|(?:Admit{SPACES}Obligations))");

        let instance_frag = format!("{maybe_locality}{MAYBE_SPACES}Instance");
        let ltac_frag = format!("{maybe_locality}{MAYBE_SPACES}Ltac");

        // Lemma shape: keyword, name (possibly empty), optional args, then a
        // colon-separated statement.
        let lemma_shape = format!(
            "{maybe_polymorphic}{maybe_locality}\
             (?:Theorem|Lemma|Example|{instance_frag}){SPACES}\
             (?P<lemma_nm>(?:{NON_SPACES}|))\
             (?P<lemma_args>{ANYTHING})?{MAYBE_SPACES}\
             :{MAYBE_SPACES}(?P<lemma_stmt>{ANYTHING})"
        );
        let anon_instance_shape = format!(
            "{maybe_polymorphic}{maybe_locality}{instance_frag}{MAYBE_SPACES}\
             (?P<anon_args>{ANYTHING})?{MAYBE_SPACES}\
             :{MAYBE_SPACES}(?P<anon_stmt>{ANYTHING})"
        );

        Matchers {
            any: re(&sentence(ANYTHING)),
            import: re(&sentence(&format!(
                "(?:{definitely_from})?{require_import}{SPACED_STUFF}"
            ))),
            import_no_from: re(&sentence(&format!(
                "{MAYBE_SPACES}{require_import}{SPACED_STUFF}"
            ))),
            export: re(&sentence(&format!(
                "(?:{definitely_from})?{require_export}{SPACED_STUFF}"
            ))),
            export_no_from: re(&sentence(&format!(
                "{MAYBE_SPACES}{require_export}{SPACED_STUFF}"
            ))),
            include: re(&sentence(&format!("{MAYBE_SPACES}Include{SPACED_STUFF}"))),
            set_flag: re(&sentence(&format!("{maybe_locality}Set{SPACED_STUFF}"))),
            open_scope: re(&sentence(&format!("{maybe_locality}Open{SPACED_STUFF}"))),
            close_scope: re(&sentence(&format!("{maybe_locality}Close{SPACED_STUFF}"))),
            derive: re(&sentence(&format!(
                "(?:{only_something}{MAYBE_SPACES})?derive{ANYTHING}"
            ))),
            definition: re(&sentence(&format!(
                "{maybe_locality}{MAYBE_SPACES}Definition{ANYTHING}"
            ))),
            fixpoint: re(&sentence(&format!(
                "{maybe_locality}{MAYBE_SPACES}Fixpoint{ANYTHING}"
            ))),
            inductive: re(&sentence(&format!("(?:Inductive|Variant){ANYTHING}"))),
            ltac: re(&sentence(&format!("{ltac_frag}{ANYTHING}[^:]:={ANYTHING}"))),
            ltac_override_with_idtac: re(&sentence(&format!(
                "{ltac_frag}{ANYTHING}::={MAYBE_SPACES}idtac"
            ))),
            implicit_types: re(&sentence(&format!("Implicit Types?{ANYTHING}"))),
            interactive_instance: re(&sentence(&format!("{instance_frag}{ANYTHING}"))),
            defined_instance: re(&sentence(&format!(
                "{maybe_locality}{MAYBE_SPACES}(?:Existing|Declare){MAYBE_SPACES}Instance{ANYTHING}"
            ))),
            register_hints: re(&sentence(&format!(
                "{maybe_locality}Hint (?:Extern|Resolve){SPACED_STUFF}"
            ))),
            local_register_hints: re(&sentence(&format!(
                "{local}{MAYBE_SPACES}Hint Resolve{SPACED_STUFF}"
            ))),
            unregister_hints: re(&sentence(&format!(
                "{maybe_locality}Remove Hints{SPACED_STUFF}"
            ))),
            local_notation: re(&sentence(&format!(
                "{local}{MAYBE_SPACES}Notation{ANYTHING}"
            ))),
            context_decl: re(&sentence(&format!("Context{SPACED_STUFF}"))),
            namespace_open: re(&sentence(&format!(
                r"{maybe_locality}NES\.Open{SPACED_STUFF}"
            ))),
            lemma: re(&sentence(&lemma_shape)),
            goal: re(&sentence(&format!(
                "{maybe_locality}Goal{SPACES}(?P<goal_stmt>{ANYTHING})"
            ))),
            anonymous_instance: re(&sentence(&anon_instance_shape)),
            section_begin: re(&sentence(&format!(
                "Section{SPACES}(?P<name>{NON_SPACES})"
            ))),
            module_type_begin: re(&sentence(&format!(
                "Module{SPACES}Type{SPACES}(?P<name>{NON_SPACES})\
                 (?:{SPACES}(?P<sig>{MAYBE_ANYTHING}))?"
            ))),
            module_begin: re(&sentence(&format!(
                "Module{SPACES}(?:Import|Export)?{MAYBE_SPACES}(?P<name>{NON_SPACES})\
                 (?:{SPACES}(?P<sig>{MAYBE_ANYTHING}))?"
            ))),
            namespace_begin: re(&sentence(&format!(
                r"NES\.Begin{SPACES}(?P<name>{NON_SPACES})"
            ))),
            nest_end: re(&sentence(&format!(
                r"(?:NES\.End|End)(?P<trailer>{SPACED_STUFF})"
            ))),
            proof_begin: re(&sentence(&format!("{proof_begin_frag}{MAYBE_ANYTHING}"))),
            proof_end: re(&sentence(&format!("{MAYBE_ANYTHING}{proof_end_frag}"))),
            proof_oneliner: re(&sentence(&format!(
                "{MAYBE_ANYTHING}{proof_begin_frag}{MAYBE_ANYTHING}{proof_end_frag}"
            ))),

            colon_equals: re(":="),
            program_search: re(&definitely_program),
            program_at_start: re(&format!(r"^\s*{definitely_program}")),
            equations_at_start: re(r"^\s*Equations"),
            next_obligation_at_start: re(r"^\s*(?:Fail\s+)?Next\s+Obligation"),
            explained_forms: vec![
                // let ... := ... in — contents unrestricted.
                re(r"let[\s\S]+\s*:=\s*(?:[\s\S]+|\([\s\S]+\)%\S+)in"),
                // Bracketed forms: contents must not cross the opposite
                // delimiter.
                re(r"\([^)]+\s*:=\s*(?:[^(]+|\([^(]+\)%\S+)\)"),
                re(r"\[[^\]]+\s*:=\s*(?:[^\[]+|\([^\[]+\)%\S+)\]"),
                re(r"\{[^}]+\s*:=\s*(?:[^{]+|\([^{]+\)%\S+)\}"),
                re(r"<[^>]+\s*:=\s*(?:[^<]+|\([^<]+\)%\S+)>"),
                re(r"\|[^|]+\s*:=\s*(?:[^|]+|\([^|]+\)%\S+)\|"),
            ],
        }
    }

    /// Resolve a policy-referable pattern id to its compiled regex.
    pub fn get(&self, id: PatternId) -> &Regex {
        match id {
            PatternId::Any => &self.any,
            PatternId::Import => &self.import,
            PatternId::ImportNoFrom => &self.import_no_from,
            PatternId::Export => &self.export,
            PatternId::ExportNoFrom => &self.export_no_from,
            PatternId::Include => &self.include,
            PatternId::SetFlag => &self.set_flag,
            PatternId::OpenScope => &self.open_scope,
            PatternId::CloseScope => &self.close_scope,
            PatternId::Derive => &self.derive,
            PatternId::Definition => &self.definition,
            PatternId::Fixpoint => &self.fixpoint,
            PatternId::Inductive => &self.inductive,
            PatternId::Ltac => &self.ltac,
            PatternId::LtacOverrideWithIdtac => &self.ltac_override_with_idtac,
            PatternId::ImplicitTypes => &self.implicit_types,
            PatternId::InteractiveInstance => &self.interactive_instance,
            PatternId::DefinedInstance => &self.defined_instance,
            PatternId::RegisterHints => &self.register_hints,
            PatternId::LocalRegisterHints => &self.local_register_hints,
            PatternId::UnregisterHints => &self.unregister_hints,
            PatternId::LocalNotation => &self.local_notation,
            PatternId::ContextDecl => &self.context_decl,
            PatternId::NamespaceOpen => &self.namespace_open,
            PatternId::Lemma => &self.lemma,
            PatternId::Goal => &self.goal,
            PatternId::AnonymousInstance => &self.anonymous_instance,
            PatternId::SectionBegin => &self.section_begin,
            PatternId::ModuleTypeBegin => &self.module_type_begin,
            PatternId::ModuleBegin => &self.module_begin,
            PatternId::NamespaceBegin => &self.namespace_begin,
            PatternId::NestEnd => &self.nest_end,
            PatternId::ProofBegin => &self.proof_begin,
            PatternId::ProofEnd => &self.proof_end,
            PatternId::ProofOneliner => &self.proof_oneliner,
        }
    }
}
