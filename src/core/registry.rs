use crate::core::{
    domain::{Arg, CommandTemplate, Invocation, LanguageSpec, Program, Staging},
    traits::probe::ToolchainProbe,
};

static BUILTIN: ToolchainRegistry = ToolchainRegistry { specs: LANGUAGES };

const NATIVE_RUN: CommandTemplate = CommandTemplate {
    program: Program::Artifact,
    args: &[],
};

const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        id: "c",
        source_extension: ".c",
        staging: Staging::File,
        invocation: Invocation::CompileThenRun {
            compile: CommandTemplate {
                program: Program::Toolchain(&["gcc"]),
                args: &[Arg::Source, Arg::Lit("-o"), Arg::Artifact],
            },
            run: NATIVE_RUN,
        },
    },
    LanguageSpec {
        id: "cpp",
        source_extension: ".cpp",
        staging: Staging::File,
        invocation: Invocation::CompileThenRun {
            compile: CommandTemplate {
                program: Program::Toolchain(&["g++"]),
                args: &[Arg::Source, Arg::Lit("-o"), Arg::Artifact],
            },
            run: NATIVE_RUN,
        },
    },
    LanguageSpec {
        id: "java",
        source_extension: ".java",
        staging: Staging::Directory { entry: "Main" },
        invocation: Invocation::CompileThenRun {
            compile: CommandTemplate {
                program: Program::Toolchain(&["javac"]),
                args: &[Arg::Source],
            },
            run: CommandTemplate {
                program: Program::Toolchain(&["java"]),
                args: &[Arg::Lit("-cp"), Arg::WorkDir, Arg::Entry],
            },
        },
    },
    LanguageSpec {
        id: "python",
        source_extension: ".py",
        staging: Staging::File,
        invocation: Invocation::SingleStep(CommandTemplate {
            program: Program::Toolchain(&["python3", "python"]),
            args: &[Arg::Source],
        }),
    },
    LanguageSpec {
        id: "javascript",
        source_extension: ".js",
        staging: Staging::File,
        invocation: Invocation::SingleStep(CommandTemplate {
            program: Program::Toolchain(&["node"]),
            args: &[Arg::Source],
        }),
    },
];

/// Read-only table of supported languages.
#[derive(Debug)]
pub struct ToolchainRegistry {
    specs: &'static [LanguageSpec],
}

impl ToolchainRegistry {
    pub fn builtin() -> &'static ToolchainRegistry {
        &BUILTIN
    }

    pub fn lookup(&self, language: &str) -> Option<&'static LanguageSpec> {
        self.specs.iter().find(|spec| spec.id == language)
    }

    pub fn languages(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|spec| spec.id)
    }

    /// Ids whose toolchains are installed right now, in registry order.
    pub fn list_available(&self, probe: &dyn ToolchainProbe) -> Vec<&'static str> {
        self.specs
            .iter()
            .filter(|spec| {
                let available = spec.is_available(probe);
                tracing::debug!("Toolchain for {} available: {}", spec.id, available);
                available
            })
            .map(|spec| spec.id)
            .collect()
    }
}
