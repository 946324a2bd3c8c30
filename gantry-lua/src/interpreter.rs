//! Template compilation and execution
//!
//! A template is Lua source defining a single entry point:
//!
//! ```lua
//! function main(ctx)
//!   return {
//!     version = "1",
//!     steps = {
//!       { name = "build", image = ctx.vars.image, commands = { "go build" } },
//!     },
//!   }
//! end
//! ```
//!
//! Compilation happens once per distinct source; execution always builds a
//! fresh sandbox, so invocations share no interpreter state. A watchdog hook
//! runs between instruction batches to enforce the wall-clock deadline and
//! the caller's cancel flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use gantry_core::{EvalError, SourcePosition};
use mlua::{ChunkMode, Function, HookTriggers, Lua, Value as LuaValue, VmState};
use serde_json::Value as JsonValue;

use crate::module::ModuleRegistry;
use crate::modules::{LogModule, LogSink};
use crate::sandbox::Sandbox;
use crate::value::{json_to_lua, lua_to_json};

/// Name of the entry-point function every template must define.
pub const ENTRY_POINT: &str = "main";

/// Chunk name templates are loaded under; appears in error positions.
pub const CHUNK_NAME: &str = "template";

/// Resource ceilings for one template invocation.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Wall-clock budget for the whole invocation
    pub timeout: Duration,
    /// Lua allocator ceiling in bytes
    pub memory_limit: usize,
    /// Instructions between watchdog checks
    pub hook_interval: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            memory_limit: 64 * 1024 * 1024,
            hook_interval: 4096,
        }
    }
}

const TRIP_NONE: u8 = 0;
const TRIP_DEADLINE: u8 = 1;
const TRIP_CANCELLED: u8 = 2;

/// A template compiled to Lua bytecode.
///
/// The bytecode is immutable and safe to share across invocations; every
/// [`execute`](Self::execute) call loads it into a freshly constructed
/// sandbox.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    bytecode: Arc<Vec<u8>>,
}

impl CompiledTemplate {
    /// Compiles template source without running it.
    ///
    /// # Errors
    /// Returns `TemplateLoad` on syntax errors, with the offending line
    /// where Lua reports one.
    pub fn compile(source: &str) -> Result<CompiledTemplate, EvalError> {
        let sandbox = Sandbox::new(&ModuleRegistry::new(), None).map_err(setup_error)?;
        let function = sandbox
            .lua()
            .load(source)
            .set_name(CHUNK_NAME)
            .into_function()
            .map_err(classify_load)?;

        // Keep debug info so runtime errors still carry line numbers
        let bytecode = function.dump(false);
        Ok(CompiledTemplate {
            bytecode: Arc::new(bytecode),
        })
    }

    /// Runs the template's `main` against `context` in a fresh sandbox.
    ///
    /// `sink` receives everything the template logs; `cancel` is polled by
    /// the watchdog between instruction batches.
    ///
    /// # Errors
    /// - `TemplateLoad` if the chunk defines no unary `main` function
    /// - `TemplateRuntime` if the template raises or returns an
    ///   unrepresentable value
    /// - `TemplateTimeout` / `TemplateResource` when a limit is exceeded
    /// - `Cancelled` when the cancel flag was raised mid-run
    pub fn execute(
        &self,
        context: &JsonValue,
        limits: &Limits,
        sink: impl LogSink + 'static,
        cancel: Arc<AtomicBool>,
    ) -> Result<JsonValue, EvalError> {
        let mut registry = ModuleRegistry::new();
        registry.register(LogModule::new(sink));

        let sandbox = Sandbox::new(&registry, Some(limits.memory_limit)).map_err(setup_error)?;
        let lua = sandbox.lua();

        let tripped = Arc::new(AtomicU8::new(TRIP_NONE));
        install_watchdog(
            lua,
            limits.hook_interval,
            Instant::now() + limits.timeout,
            cancel,
            Arc::clone(&tripped),
        );

        // Top-level template code runs here: function definitions, constants
        lua.load(self.bytecode.as_slice())
            .set_name(CHUNK_NAME)
            .set_mode(ChunkMode::Binary)
            .exec()
            .map_err(|e| classify_exec(e, &tripped, limits))?;

        let entry = resolve_entry_point(&sandbox)?;

        let ctx_value = json_to_lua(lua, context).map_err(setup_error)?;
        let result: LuaValue = entry
            .call(ctx_value)
            .map_err(|e| classify_exec(e, &tripped, limits))?;

        lua_to_json(&result).map_err(|e| EvalError::TemplateRuntime {
            message: e.to_string(),
            position: None,
        })
    }
}

/// Finds `main` in the sandbox globals and checks its shape.
fn resolve_entry_point(sandbox: &Sandbox) -> Result<Function, EvalError> {
    let value: LuaValue = sandbox
        .lua()
        .globals()
        .get(ENTRY_POINT)
        .map_err(setup_error)?;

    let entry = match value {
        LuaValue::Function(f) => f,
        LuaValue::Nil => {
            return Err(EvalError::TemplateLoad {
                message: format!("template does not define a `{ENTRY_POINT}` function"),
                position: None,
            });
        }
        other => {
            return Err(EvalError::TemplateLoad {
                message: format!(
                    "`{ENTRY_POINT}` must be a function, found {}",
                    other.type_name()
                ),
                position: None,
            });
        }
    };

    let (nparams, variadic) = sandbox.function_params(&entry).map_err(setup_error)?;
    if nparams != 1 || variadic {
        return Err(EvalError::TemplateLoad {
            message: format!(
                "`{ENTRY_POINT}` must take exactly one argument (the context), found {}{}",
                nparams,
                if variadic { "+varargs" } else { "" }
            ),
            position: None,
        });
    }

    Ok(entry)
}

fn install_watchdog(
    lua: &Lua,
    hook_interval: u32,
    deadline: Instant,
    cancel: Arc<AtomicBool>,
    tripped: Arc<AtomicU8>,
) {
    let triggers = HookTriggers::new().every_nth_instruction(hook_interval);
    lua.set_hook(triggers, move |_lua, _debug| {
        if cancel.load(Ordering::Relaxed) {
            tripped.store(TRIP_CANCELLED, Ordering::Relaxed);
            return Err(mlua::Error::RuntimeError("evaluation cancelled".to_string()));
        }
        if Instant::now() >= deadline {
            tripped.store(TRIP_DEADLINE, Ordering::Relaxed);
            return Err(mlua::Error::RuntimeError(
                "time budget exhausted".to_string(),
            ));
        }
        Ok(VmState::Continue)
    });
}

/// Sandbox preparation failures: allocator exhaustion, hook installation.
/// These are host-side resource faults, not template faults.
fn setup_error(err: mlua::Error) -> EvalError {
    EvalError::TemplateResource(format!("failed to prepare evaluation sandbox: {err}"))
}

fn classify_load(err: mlua::Error) -> EvalError {
    match err {
        mlua::Error::SyntaxError { message, .. } => EvalError::TemplateLoad {
            position: parse_position(&message),
            message,
        },
        mlua::Error::MemoryError(message) => EvalError::TemplateResource(message),
        other => EvalError::TemplateLoad {
            message: other.to_string(),
            position: None,
        },
    }
}

fn classify_exec(err: mlua::Error, tripped: &AtomicU8, limits: &Limits) -> EvalError {
    match tripped.load(Ordering::Relaxed) {
        TRIP_DEADLINE => {
            return EvalError::TemplateTimeout {
                timeout_ms: limits.timeout.as_millis() as u64,
            };
        }
        TRIP_CANCELLED => return EvalError::Cancelled,
        _ => {}
    }

    match err {
        mlua::Error::SyntaxError { message, .. } => EvalError::TemplateLoad {
            position: parse_position(&message),
            message,
        },
        mlua::Error::MemoryError(message) => EvalError::TemplateResource(message),
        mlua::Error::CallbackError { cause, .. } => {
            classify_exec(cause.as_ref().clone(), tripped, limits)
        }
        mlua::Error::RuntimeError(message) => EvalError::TemplateRuntime {
            position: parse_position(&message),
            message,
        },
        other => EvalError::TemplateRuntime {
            message: other.to_string(),
            position: None,
        },
    }
}

/// Extracts `chunk:line` from a Lua error message, e.g.
/// `[string "template"]:3: attempt to index a nil value`.
fn parse_position(message: &str) -> Option<SourcePosition> {
    let quoted = format!("{CHUNK_NAME}\"]:");
    let rest = if let Some(idx) = message.find(&quoted) {
        &message[idx + quoted.len()..]
    } else {
        let plain = format!("{CHUNK_NAME}:");
        let idx = message.find(&plain)?;
        &message[idx + plain.len()..]
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let line = digits.parse().ok()?;
    Some(SourcePosition {
        chunk: CHUNK_NAME.to_string(),
        line,
    })
}
