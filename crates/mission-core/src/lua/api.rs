//! Script-facing API: the `misn`, `hook`, `planet`, `system`, `faction`
//! and `ship` tables.

use std::rc::Rc;

use mlua::{AnyUserData, Lua, MetaMethod, Table, UserData, UserDataMethods, Value};

use crate::cargo::CargoId;
use crate::mission::{Marker, MarkerKind, ScriptRequest};
use crate::script::ScriptBinding;
use crate::universe::{DomainRef, RefKind, Universe};

/// Domain reference as seen by scripts.
#[derive(Debug, Clone)]
pub(crate) struct LuaRef(pub DomainRef);

impl UserData for LuaRef {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_method("name", |_, this, ()| Ok(this.0.name.clone()));
        methods.add_method("kind", |_, this, ()| Ok(this.0.kind.label()));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.name.clone()));
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other.borrow::<LuaRef>().is_ok_and(|o| o.0 == this.0))
        });
    }
}

/// Returned by an `abort` entry point that tears itself down later.
pub(crate) struct DeferToken;

impl UserData for DeferToken {}

fn runtime_error(message: String) -> mlua::Error {
    mlua::Error::RuntimeError(message)
}

/// Register `planet.get`, `system.get`, `faction.get` and `ship.get`.
pub(crate) fn register_refs(lua: &Lua, universe: &Rc<Universe>) -> mlua::Result<()> {
    let globals = lua.globals();
    for kind in [RefKind::Planet, RefKind::System, RefKind::Faction, RefKind::Ship] {
        let table = lua.create_table()?;
        let universe = Rc::clone(universe);
        let get = lua.create_function(move |lua, name: String| {
            match universe.resolve(kind, &name) {
                Some(r) => Ok(Value::UserData(lua.create_userdata(LuaRef(r))?)),
                None => Ok(Value::Nil),
            }
        })?;
        table.set("get", get)?;
        globals.set(kind.label(), table)?;
    }
    Ok(())
}

/// System named by a string or carried by a system/planet reference.
fn system_arg(universe: &Universe, arg: Value) -> mlua::Result<String> {
    let name = match arg {
        Value::String(s) => s.to_str()?.to_string(),
        Value::UserData(ud) => {
            let r = ud.borrow::<LuaRef>()?.0.clone();
            match r.kind {
                RefKind::System => r.name,
                RefKind::Planet => universe
                    .planet(&r.name)
                    .map(|p| p.system.clone())
                    .ok_or_else(|| runtime_error(format!("unknown planet '{}'", r.name)))?,
                other => {
                    return Err(runtime_error(format!(
                        "expected a system, got a {}",
                        other.label()
                    )))
                }
            }
        }
        other => {
            return Err(runtime_error(format!(
                "expected a system, got {}",
                other.type_name()
            )))
        }
    };
    if !universe.has_system(&name) {
        return Err(runtime_error(format!("unknown system '{}'", name)));
    }
    Ok(name)
}

fn register_misn(lua: &Lua, binding: &ScriptBinding, universe: &Rc<Universe>) -> mlua::Result<()> {
    let misn = lua.create_table()?;

    let state = binding.state.clone();
    misn.set(
        "setTitle",
        lua.create_function(move |_, title: String| {
            state.borrow_mut().title = Some(title);
            Ok(())
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "setDesc",
        lua.create_function(move |_, desc: String| {
            state.borrow_mut().description = Some(desc);
            Ok(())
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "setReward",
        lua.create_function(move |_, reward: String| {
            state.borrow_mut().reward = Some(reward);
            Ok(())
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "setNPC",
        lua.create_function(move |_, (name, portrait): (String, Option<String>)| {
            let mut s = state.borrow_mut();
            s.npc = Some(name);
            s.portrait = portrait;
            Ok(())
        })?,
    )?;

    let state = binding.state.clone();
    let uni = Rc::clone(universe);
    misn.set(
        "setMarker",
        lua.create_function(move |_, (system, kind): (Value, Option<String>)| {
            let system = system_arg(&uni, system)?;
            let kind = match kind.as_deref() {
                None => MarkerKind::Misc,
                Some(label) => MarkerKind::from_label(label)
                    .ok_or_else(|| runtime_error(format!("unknown marker kind '{}'", label)))?,
            };
            state.borrow_mut().marker = Some(Marker { system, kind });
            Ok(())
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "accept",
        lua.create_function(move |_, ()| {
            let mut s = state.borrow_mut();
            if !s.accepted && s.can_accept {
                s.accepted = true;
            }
            Ok(s.accepted)
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "finish",
        lua.create_function(move |_, completed: Option<bool>| {
            state.borrow_mut().request(ScriptRequest::Finish {
                completed: completed.unwrap_or(false),
            });
            Ok(())
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "timerStart",
        lua.create_function(move |_, (callback, seconds): (String, f64)| {
            Ok(state.borrow_mut().start_timer(&callback, seconds))
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "timerStop",
        lua.create_function(move |_, slot: usize| Ok(state.borrow_mut().stop_timer(slot)))?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "linkCargo",
        lua.create_function(move |_, cargo: CargoId| Ok(state.borrow_mut().link_cargo(cargo)))?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "unlinkCargo",
        lua.create_function(move |_, cargo: CargoId| Ok(state.borrow_mut().unlink_cargo(cargo)))?,
    )?;

    let state = binding.state.clone();
    let hold = binding.hold.clone();
    misn.set(
        "cargoAdd",
        lua.create_function(move |_, (commodity, tonnes): (String, u32)| {
            let cargo = hold.borrow_mut().add_mission_cargo(&commodity, tonnes);
            state.borrow_mut().link_cargo(cargo);
            Ok(cargo)
        })?,
    )?;

    let state = binding.state.clone();
    let hold = binding.hold.clone();
    misn.set(
        "cargoRm",
        lua.create_function(move |_, cargo: CargoId| {
            if !state.borrow_mut().unlink_cargo(cargo) {
                return Ok(false);
            }
            Ok(hold.borrow_mut().remove_mission_cargo(cargo))
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "osdCreate",
        lua.create_function(move |_, (title, items): (String, Vec<String>)| {
            state
                .borrow_mut()
                .request(ScriptRequest::OsdCreate { title, items });
            Ok(())
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "osdActive",
        lua.create_function(move |_, item: usize| {
            if item == 0 {
                return Err(runtime_error("OSD items are numbered from 1".into()));
            }
            state.borrow_mut().request(ScriptRequest::OsdActive(item - 1));
            Ok(())
        })?,
    )?;

    let state = binding.state.clone();
    misn.set(
        "osdDestroy",
        lua.create_function(move |_, ()| {
            state.borrow_mut().request(ScriptRequest::OsdDestroy);
            Ok(())
        })?,
    )?;

    misn.set("DEFER", lua.create_userdata(DeferToken)?)?;

    lua.globals().set("misn", misn)
}

fn register_hook(lua: &Lua, binding: &ScriptBinding) -> mlua::Result<()> {
    let hook: Table = lua.create_table()?;
    let state = binding.state.clone();
    hook.set(
        "add",
        lua.create_function(move |_, (event, callback): (String, String)| {
            state
                .borrow_mut()
                .request(ScriptRequest::Hook { event, callback });
            Ok(())
        })?,
    )?;
    lua.globals().set("hook", hook)
}

/// Install the full mission API into a fresh state.
pub(crate) fn register(lua: &Lua, binding: &ScriptBinding, universe: &Rc<Universe>) -> mlua::Result<()> {
    register_refs(lua, universe)?;
    register_misn(lua, binding, universe)?;
    register_hook(lua, binding)
}
