//! Concrete [`ModuleEmitter`] backed by `wasm-encoder`.

use std::collections::HashMap;

use wasm_encoder::{
    CodeSection, EntityType, ExportKind, ExportSection, Function, FunctionSection, ImportSection, MemorySection,
    MemoryType, Module, NameMap, NameSection, StartSection, TypeSection, ValType,
};

use super::{FuncBody, FunctionHandle, ModuleEmitter, SignatureHandle};

/// Builds a wasm binary module one declaration at a time.
///
/// Callers must finish registering every import before adding the first
/// local function body, so that wasm's shared import/function index
/// space comes out in the right order; `sema::pass1`/`pass2` already
/// enforce this ordering by construction.
pub struct EncoderEmitter {
    types: TypeSection,
    sig_keys: HashMap<String, SignatureHandle>,
    next_type_index: u32,

    imports: ImportSection,
    functions: FunctionSection,
    code: CodeSection,
    names: NameMap,
    next_func_index: u32,

    exports: ExportSection,
    memories: MemorySection,
    has_memory: bool,
    start: Option<u32>,
}

impl EncoderEmitter {
    pub fn new() -> Self {
        Self {
            types: TypeSection::new(),
            sig_keys: HashMap::new(),
            next_type_index: 0,
            imports: ImportSection::new(),
            functions: FunctionSection::new(),
            code: CodeSection::new(),
            names: NameMap::new(),
            next_func_index: 0,
            exports: ExportSection::new(),
            memories: MemorySection::new(),
            has_memory: false,
            start: None,
        }
    }
}

impl Default for EncoderEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleEmitter for EncoderEmitter {
    fn set_memory(&mut self, initial_pages: u64, maximum_pages: Option<u64>, export_name: &str) {
        self.memories.memory(MemoryType {
            minimum: initial_pages,
            maximum: maximum_pages,
            memory64: false,
            shared: false,
            page_size_log2: None,
        });
        self.exports.export(export_name, ExportKind::Memory, 0);
        self.has_memory = true;
    }

    fn add_function_type(&mut self, key: &str, params: &[ValType], result: Option<ValType>) -> SignatureHandle {
        if let Some(handle) = self.sig_keys.get(key) {
            return *handle;
        }
        let handle = SignatureHandle(self.next_type_index);
        self.next_type_index += 1;
        self.types.ty().function(params.iter().copied(), result);
        self.sig_keys.insert(key.to_string(), handle);
        handle
    }

    fn add_function(
        &mut self,
        name: &str,
        sig: SignatureHandle,
        extra_locals: &[ValType],
        body: FuncBody,
    ) -> FunctionHandle {
        let index = self.next_func_index;
        self.next_func_index += 1;

        self.functions.function(sig.0);
        let locals: Vec<(u32, ValType)> = extra_locals.iter().map(|vt| (1, *vt)).collect();
        let mut func = Function::new(locals);
        for instr in body.instructions() {
            func.instruction(instr);
        }
        func.instruction(&wasm_encoder::Instruction::End);
        self.code.function(&func);
        self.names.append(index, name);

        FunctionHandle(index)
    }

    fn add_import(&mut self, module: &str, field: &str, sig: SignatureHandle) -> FunctionHandle {
        let index = self.next_func_index;
        self.next_func_index += 1;
        self.imports.import(module, field, EntityType::Function(sig.0));
        let qualified = format!("{module}.{field}");
        self.names.append(index, &qualified);
        FunctionHandle(index)
    }

    fn add_export(&mut self, func: FunctionHandle, external_name: &str) {
        self.exports.export(external_name, ExportKind::Func, func.0);
    }

    fn set_start(&mut self, func: FunctionHandle) {
        self.start = Some(func.0);
    }

    fn finish(self) -> Vec<u8> {
        let mut module = Module::new();
        module.section(&self.types);
        module.section(&self.imports);
        module.section(&self.functions);
        if self.has_memory {
            module.section(&self.memories);
        }
        module.section(&self.exports);
        if let Some(start) = self.start {
            module.section(&StartSection { function_index: start });
        }
        module.section(&self.code);

        let mut name_section = NameSection::new();
        name_section.functions(&self.names);
        module.section(&name_section);

        module.finish()
    }
}
