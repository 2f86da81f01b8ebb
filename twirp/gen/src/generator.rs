//! Generator orchestration.
//!
//! A [`Generator`] is the state of one run: the configuration, the import
//! alias registry, the count of files handled so far and the output buffer.
//! Files are generated one at a time; each is emitted, verified and formatted
//! before the next one starts.

use prost_types::FileDescriptorProto;
use tracing::{debug, info};

use crate::codegen::{
    ClientKind, FileContext, generate_client, generate_imports, generate_interface,
    generate_server,
};
use crate::config::GeneratorConfig;
use crate::descriptor::{descriptor_var_name, pack};
use crate::emitter::Emitter;
use crate::errors::GeneratorError;
use crate::naming::NameRegistry;
use crate::output::format_generated;
use crate::schema::{Schema, load_schemas};

/// Suffix of generated file names.
pub const GENERATED_SUFFIX: &str = ".rpc.rs";

/// Runtime modules every generated file imports.
const RUNTIME_IMPORTS: [&str; 2] = ["twirp", "ctxkit"];

/// A finished output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory.
    pub name: String,
    pub content: String,
}

/// State of one generator run.
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    registry: NameRegistry,
    files_handled: usize,
    emitter: Emitter,
}

impl Generator {
    /// Creates a generator for one run.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::ConfigError` if the configuration is invalid.
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        config.validate()?;
        let mut registry = NameRegistry::new();
        for name in RUNTIME_IMPORTS {
            registry.register(name);
        }
        Ok(Self {
            config,
            registry,
            files_handled: 0,
            emitter: Emitter::new(),
        })
    }

    /// Number of files generated so far.
    pub fn files_handled(&self) -> usize {
        self.files_handled
    }

    /// Generates one file per requested proto file that declares services.
    ///
    /// `files` must hold every descriptor the requested files depend on.
    ///
    /// ## Errors
    ///
    /// Fails on the first schema, generation or verification error; no files
    /// are returned in that case.
    pub fn generate(
        &mut self,
        files: &[FileDescriptorProto],
        file_to_generate: &[String],
    ) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let schemas = load_schemas(files, file_to_generate, &self.config)?;
        debug!(
            requested = file_to_generate.len(),
            with_services = schemas.len(),
            "loaded schemas"
        );
        schemas.iter().map(|schema| self.generate_file(schema)).collect()
    }

    /// Generates the file for one schema.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::InvalidGeneratedCode` if the emitted text does
    /// not parse, which is a defect in the generator.
    pub fn generate_file(&mut self, schema: &Schema) -> Result<GeneratedFile, GeneratorError> {
        let descriptor_var = descriptor_var_name(self.files_handled, &schema.name);
        let ctx = FileContext::new(
            schema,
            &self.config,
            self.registry.alias("twirp").unwrap_or("twirp"),
            self.registry.alias("ctxkit").unwrap_or("ctxkit"),
            &descriptor_var,
        );

        self.emitter.reset();
        self.emitter.emit(generate_imports(&ctx)?);

        for (index, service) in schema.services.iter().enumerate() {
            self.emitter.section_banner(format!("{} Interface", service.name));
            self.emitter.emit(generate_interface(&ctx, service));

            for kind in ClientKind::ALL {
                self.emitter.section_banner(kind.banner(service));
                self.emitter.emit(generate_client(&ctx, service, kind));
            }

            self.emitter
                .section_banner(format!("{} Server Handler", service.name));
            self.emitter.emit(generate_server(&ctx, service, index));
        }

        let packed = pack(&schema.descriptor, self.files_handled)?;
        self.emitter.emit_verbatim(packed.render());

        let content = format_generated(&self.emitter, &schema.name)?;
        self.emitter.reset();

        let name = format!("{}{}", schema.generated_filename_prefix(), GENERATED_SUFFIX);
        info!(
            file = %name,
            source = %schema.name,
            services = schema.services.len(),
            "generated"
        );
        self.files_handled += 1;

        Ok(GeneratedFile { name, content })
    }
}
