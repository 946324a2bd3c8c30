//! Lua sandbox creation
//!
//! This module provides a restricted Lua state that prevents template code
//! from reaching the filesystem, the network, host process state, or the
//! ability to load further code.

use mlua::{Function, Lua, LuaOptions, Result as LuaResult, StdLib, Table};

use crate::module::ModuleRegistry;

/// A restricted Lua state plus the host-side handles captured from it.
pub struct Sandbox {
    lua: Lua,
    getinfo: Function,
}

impl Sandbox {
    /// Creates a restricted sandbox and registers the given modules.
    ///
    /// The sandbox includes only basic Lua functionality (tables, strings,
    /// math, coroutines) and does NOT include any I/O capabilities or the
    /// ability to load external code.
    ///
    /// # Security
    /// This sandbox prevents:
    /// - Network access
    /// - File system access
    /// - Process execution
    /// - Reading host environment variables
    /// - Loading code via require()/dofile()/loadfile()/load()
    ///
    /// The debug library is opened only long enough to capture
    /// `debug.getinfo` for host-side arity checks; it is removed from the
    /// globals before any template code can run.
    pub fn new(registry: &ModuleRegistry, memory_limit: Option<usize>) -> LuaResult<Sandbox> {
        // Create Lua with restricted standard libraries
        // Only allow: TABLE, STRING, MATH, COROUTINE
        // Explicitly exclude: IO, OS, PACKAGE
        let lua = unsafe {
            Lua::unsafe_new_with(
                StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::COROUTINE | StdLib::DEBUG,
                LuaOptions::default(),
            )
        };

        // Capture getinfo for the host, then drop the debug library
        let debug_table: Table = lua.globals().get("debug")?;
        let getinfo: Function = debug_table.get("getinfo")?;
        lua.globals().set("debug", mlua::Nil)?;

        // Remove code-loading globals
        lua.globals().set("require", mlua::Nil)?;
        lua.globals().set("dofile", mlua::Nil)?;
        lua.globals().set("loadfile", mlua::Nil)?;
        lua.globals().set("load", mlua::Nil)?;

        // Lua 5.4 seeds math.random from ambient process state; a fixed
        // seed keeps template runs reproducible.
        lua.load("math.randomseed(0)").exec()?;

        if let Some(limit) = memory_limit {
            lua.set_memory_limit(limit)?;
        }

        registry.register_all(&lua)?;

        Ok(Sandbox { lua, getinfo })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Parameter count and variadic flag of a Lua-defined function.
    pub fn function_params(&self, function: &Function) -> LuaResult<(u32, bool)> {
        let info: Table = self.getinfo.call((function.clone(), "u"))?;
        let nparams: u32 = info.get("nparams")?;
        let isvararg: bool = info.get("isvararg")?;
        Ok((nparams, isvararg))
    }
}
