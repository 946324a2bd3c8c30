use mlua::prelude::*;

/// Trait for Gantry sandbox modules.
///
/// Each module provides functionality to template code running in the
/// sandbox. Modules have a unique identifier and can register functions,
/// tables, and other values into the Lua global scope.
pub trait SandboxModule: Send + Sync {
    /// Returns the unique identifier for this module.
    ///
    /// This identifier is used as the global variable name in Lua. For
    /// example, if `id()` returns `"log"`, the module is accessible in
    /// template code as `log.function_name()`.
    ///
    /// # Requirements
    /// - Must be a valid Lua identifier (alphanumeric + underscore, no leading digit)
    /// - Must be unique across all modules
    /// - Should be lowercase by convention
    fn id(&self) -> &'static str;

    /// Registers this module's functions and values into the Lua context.
    ///
    /// Called while the sandbox is being set up, before any template code
    /// runs.
    ///
    /// # Errors
    /// Returns `LuaError` if registration fails (e.g., invalid function, type error)
    fn register(&self, lua: &Lua) -> LuaResult<()>;
}

/// Registry for managing sandbox modules
///
/// Provides a central place to register modules before a sandbox loads them.
pub struct ModuleRegistry {
    modules: Vec<Box<dyn SandboxModule>>,
}

impl ModuleRegistry {
    /// Creates a new empty module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Registers a module
    ///
    /// # Panics
    /// Panics if a module with the same ID is already registered
    pub fn register<M: SandboxModule + 'static>(&mut self, module: M) {
        let id = module.id();
        if self.modules.iter().any(|m| m.id() == id) {
            panic!("Module with id '{}' is already registered", id);
        }
        self.modules.push(Box::new(module));
    }

    /// Registers all modules into a Lua context
    ///
    /// # Errors
    /// Returns the first error encountered during registration
    pub fn register_all(&self, lua: &Lua) -> LuaResult<()> {
        for module in &self.modules {
            module.register(lua)?;
        }
        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestModule;

    impl SandboxModule for TestModule {
        fn id(&self) -> &'static str {
            "test"
        }

        fn register(&self, lua: &Lua) -> LuaResult<()> {
            let table = lua.create_table()?;
            table.set("value", 42)?;
            lua.globals().set(self.id(), table)?;
            Ok(())
        }
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration() {
        let mut registry = ModuleRegistry::new();
        registry.register(TestModule);
        registry.register(TestModule);
    }

    #[test]
    fn test_register_all() {
        let mut registry = ModuleRegistry::new();
        registry.register(TestModule);

        let lua = Lua::new();
        registry.register_all(&lua).unwrap();

        let value: i32 = lua.load("return test.value").eval().unwrap();
        assert_eq!(value, 42);
    }
}
