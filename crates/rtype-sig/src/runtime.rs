//! The runtime: class hierarchy, method table and dispatch.
//!
//! Every definition goes through here so that entity rules (`final!`,
//! `sealed!`, `abstract!`, `interface!`) and method contracts are enforced at
//! the point where the offending declaration happens.

use crate::body::ClassBody;
use crate::builder::{IntoDeclaration, SigBuilder};
use crate::config::ValidationConfig;
use crate::contracts::{
    Ancestor, MethodSite, abstract_owner, check_override, final_override, final_redefinition,
    interface_method,
};
use crate::error::{CallError, ContractError, Error, HierarchyError};
use crate::handlers::Handlers;
use crate::method::{Args, MethodBody, MethodDef, MethodParam, Visibility};
use crate::signature::{Mode, Signature};
use crate::validation::{ValidationContext, install};
use dashmap::DashMap;
use rtype_common::SourceLocation;
use rtype_solver::{
    ClassFlags, ClassId, ClassKind, ClassTable, CoerceError, InspectOptions, ObjectRef, RawType,
    TypeDatabase, TypeId, TypeInterner, Value, coerce,
};
use rustc_hash::FxBuildHasher;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// One installed method.
pub struct MethodEntry {
    pub owner: ClassId,
    pub name: Arc<str>,
    pub params: Vec<MethodParam>,
    pub location: SourceLocation,
    pub visibility: Visibility,
    pub signature: Option<Arc<Signature>>,
    /// The callable actually dispatched to (validated when signed).
    pub body: MethodBody,
}

impl MethodEntry {
    fn site<'a>(&'a self, owner: &'a str) -> Option<MethodSite<'a>> {
        self.signature.as_deref().map(|signature| MethodSite {
            owner,
            location: &self.location,
            signature,
            visibility: self.visibility,
        })
    }

    pub fn is_abstract(&self) -> bool {
        self.signature
            .as_ref()
            .is_some_and(|s| s.mode == Mode::Abstract)
    }
}

impl std::fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("location", &self.location)
            .field("signed", &self.signature.is_some())
            .finish_non_exhaustive()
    }
}

type MethodKey = (ClassId, Arc<str>);

pub struct Runtime {
    ctx: Arc<ValidationContext>,
    methods: DashMap<MethodKey, Arc<MethodEntry>, FxBuildHasher>,
    /// File each sealed entity was declared in.
    sealed_in: DashMap<ClassId, SourceLocation, FxBuildHasher>,
    /// Entities that inherited, included or extended a sealed entity.
    sealed_subclasses: DashMap<ClassId, Vec<ClassId>, FxBuildHasher>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(ValidationConfig::default())
    }

    pub fn with_config(config: ValidationConfig) -> Self {
        Self {
            ctx: Arc::new(ValidationContext::new(config)),
            methods: DashMap::default(),
            sealed_in: DashMap::default(),
            sealed_subclasses: DashMap::default(),
        }
    }

    pub fn context(&self) -> &Arc<ValidationContext> {
        &self.ctx
    }

    pub fn types(&self) -> &TypeInterner {
        &self.ctx.types
    }

    pub fn classes(&self) -> &ClassTable {
        self.ctx.types.classes()
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.ctx.config
    }

    pub fn handlers(&self) -> &Handlers {
        &self.ctx.handlers
    }

    /// Resolve a raw type (class, enum member, type or expression).
    pub fn ty(&self, raw: impl Into<RawType>) -> Result<TypeId, CoerceError> {
        coerce(&self.ctx.types, raw)
    }

    pub fn inspect(&self, value: &Value) -> String {
        value.inspect(self.classes(), &self.ctx.config.inspect)
    }

    pub fn inspect_with(&self, value: &Value, opts: &InspectOptions) -> String {
        value.inspect(self.classes(), opts)
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    pub fn define_class(
        &self,
        name: &str,
        superclass: Option<ClassId>,
        location: SourceLocation,
    ) -> Result<ClassId, HierarchyError> {
        let parent = superclass.unwrap_or(ClassId::OBJECT);
        self.check_inheritable(parent, "inherited", &location)?;
        let id = self
            .classes()
            .define_class(name, Some(parent), Some(location))?;
        self.record_sealed_child(parent, id);
        debug!(class = name, parent = %self.classes().name(parent), "defined class");
        Ok(id)
    }

    pub fn define_module(&self, name: &str, location: SourceLocation) -> Result<ClassId, HierarchyError> {
        let id = self.classes().define_module(name, Some(location))?;
        debug!(module = name, "defined module");
        Ok(id)
    }

    /// `include module` in `target`. Rolled back if one of the module's
    /// methods would shadow a final method of `target`.
    pub fn include(
        &self,
        target: ClassId,
        module: ClassId,
        location: &SourceLocation,
    ) -> Result<(), Error> {
        self.check_inheritable(module, "included", location)?;
        let classes = self.classes();
        let already = classes.get(target)?.includes.contains(&module);
        classes.add_include(target, module)?;
        let chain = classes.ancestors(target);
        if let Err(err) = self.check_final_shadowing(&chain, target, module, location) {
            if !already {
                classes.remove_include(target, module);
            }
            return Err(err.into());
        }
        self.record_sealed_child(module, target);
        Ok(())
    }

    /// `extend module` on `target`: the module's methods become methods of
    /// the class object.
    pub fn extend(
        &self,
        target: ClassId,
        module: ClassId,
        location: &SourceLocation,
    ) -> Result<(), Error> {
        self.check_inheritable(module, "extended", location)?;
        let classes = self.classes();
        let already = classes.get(target)?.extends.contains(&module);
        classes.add_extend(target, module)?;
        let chain = classes.singleton_ancestors(target);
        if let Err(err) = self.check_final_shadowing(&chain, target, module, location) {
            if !already {
                classes.remove_extend(target, module);
            }
            return Err(err.into());
        }
        self.record_sealed_child(module, target);
        Ok(())
    }

    /// Every method `module` brings along must still resolve to a method that
    /// does not shadow a final method further down `chain`.
    fn check_final_shadowing(
        &self,
        chain: &[ClassId],
        target: ClassId,
        module: ClassId,
        location: &SourceLocation,
    ) -> Result<(), ContractError> {
        let classes = self.classes();
        let contributed = classes.ancestors(module);
        let mut names: Vec<Arc<str>> = self
            .methods
            .iter()
            .filter(|e| contributed.contains(&e.key().0))
            .map(|e| e.key().1.clone())
            .collect();
        names.sort();
        names.dedup();
        for name in names {
            let mut found = chain
                .iter()
                .filter_map(|&c| self.methods.get(&(c, name.clone())).map(|e| e.value().clone()));
            let Some(visible) = found.next() else {
                continue;
            };
            for shadowed in found {
                if shadowed.owner == visible.owner {
                    continue;
                }
                let owner = classes.name(shadowed.owner);
                if let Some(site) = shadowed.site(&owner) {
                    if site.signature.is_final {
                        return Err(final_override(&name, &site, &classes.name(target), location));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_inheritable(
        &self,
        parent: ClassId,
        verb: &'static str,
        caller: &SourceLocation,
    ) -> Result<(), HierarchyError> {
        let classes = self.classes();
        let flags = classes.flags(parent);
        if flags.contains(ClassFlags::FINAL) {
            return Err(HierarchyError::Final {
                entity: classes.name(parent),
                verb,
            });
        }
        if !flags.contains(ClassFlags::SEALED) {
            return Ok(());
        }
        let Some(declared) = self.sealed_in.get(&parent).map(|e| e.value().clone()) else {
            return Ok(());
        };
        let caller_path = caller.path();
        if caller_path.starts_with(declared.path()) || self.ctx.config.is_sealed_allowed(caller_path) {
            return Ok(());
        }
        Err(HierarchyError::Sealed {
            entity: classes.name(parent),
            verb,
            declared_in: declared.file.clone(),
            caller: caller.file.clone(),
        })
    }

    fn record_sealed_child(&self, parent: ClassId, child: ClassId) {
        if self.classes().flags(parent).contains(ClassFlags::SEALED) {
            self.sealed_subclasses.entry(parent).or_default().push(child);
        }
    }

    // -------------------------------------------------------------------------
    // Entity declarations
    // -------------------------------------------------------------------------

    /// `abstract!`
    pub fn abstract_(&self, class: ClassId) -> Result<(), HierarchyError> {
        self.classes().add_flags(class, ClassFlags::ABSTRACT)?;
        Ok(())
    }

    /// `interface!` (modules only).
    pub fn interface(&self, module: ClassId) -> Result<(), HierarchyError> {
        let info = self.classes().get(module)?;
        if info.kind != ClassKind::Module {
            return Err(HierarchyError::InterfaceOnClass(info.name));
        }
        self.classes()
            .add_flags(module, ClassFlags::INTERFACE | ClassFlags::ABSTRACT)?;
        Ok(())
    }

    /// `sealed!`: only `location`'s file may inherit, include or extend.
    pub fn sealed(&self, class: ClassId, location: SourceLocation) -> Result<(), HierarchyError> {
        let info = self.classes().get(class)?;
        if info.flags.contains(ClassFlags::FINAL) {
            return Err(HierarchyError::SealedAfterFinal(info.name));
        }
        if info.flags.contains(ClassFlags::SEALED) {
            return Err(HierarchyError::SealedTwice(info.name));
        }
        self.classes().add_flags(class, ClassFlags::SEALED)?;
        self.sealed_in.insert(class, location);
        Ok(())
    }

    /// `final!`: no subclasses, includes or extends.
    pub fn final_(&self, class: ClassId) -> Result<(), HierarchyError> {
        let info = self.classes().get(class)?;
        if info.flags.contains(ClassFlags::SEALED) {
            return Err(HierarchyError::FinalAfterSealed(info.name));
        }
        if info.flags.contains(ClassFlags::FINAL) {
            return Err(HierarchyError::FinalTwice(info.name));
        }
        self.classes().add_flags(class, ClassFlags::FINAL)?;
        Ok(())
    }

    /// Entities that inherited, included or extended the sealed `class`.
    pub fn sealed_subclasses(&self, class: ClassId) -> Vec<ClassId> {
        self.sealed_subclasses
            .get(&class)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// An enum: a final class whose only instances are the given members,
    /// labelled `Name::Label`. Each member serializes to its lowercased label.
    pub fn define_enum(
        &self,
        name: &str,
        labels: &[&str],
        location: SourceLocation,
    ) -> Result<(ClassId, Vec<ObjectRef>), HierarchyError> {
        let members: Vec<(&str, Option<Value>)> = labels.iter().map(|&label| (label, None)).collect();
        self.define_enum_members(name, &members, location)
    }

    /// [`Self::define_enum`] with an explicit serialized form per member.
    pub fn define_enum_serialized(
        &self,
        name: &str,
        members: &[(&str, Value)],
        location: SourceLocation,
    ) -> Result<(ClassId, Vec<ObjectRef>), HierarchyError> {
        let members: Vec<(&str, Option<Value>)> = members
            .iter()
            .map(|(label, serialized)| (*label, Some(serialized.clone())))
            .collect();
        self.define_enum_members(name, &members, location)
    }

    fn define_enum_members(
        &self,
        name: &str,
        members: &[(&str, Option<Value>)],
        location: SourceLocation,
    ) -> Result<(ClassId, Vec<ObjectRef>), HierarchyError> {
        let class = self.define_class(name, None, location)?;
        let classes = self.classes();
        classes.add_flags(class, ClassFlags::ENUM | ClassFlags::FINAL)?;
        let mut values = Vec::with_capacity(members.len());
        for (label, serialized) in members {
            let member = ObjectRef::labelled(class, format!("{name}::{label}"));
            match serialized {
                Some(serialized) => {
                    classes.register_enum_value_serialized(class, member.clone(), serialized.clone())?
                }
                None => classes.register_enum_value(class, member.clone())?,
            }
            values.push(member);
        }
        debug!(r#enum = name, members = values.len(), "defined enum");
        Ok((class, values))
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Open a class body for `sig` / `def` pairs.
    pub fn class_body(&self, class: ClassId) -> ClassBody<'_> {
        ClassBody::new(self, class)
    }

    /// Define `def` on `class` without a signature.
    pub fn define_unsigned(&self, class: ClassId, def: MethodDef) -> Result<(), Error> {
        self.define_method(class, def, None::<SigBuilder>)
    }

    /// Define `def` on `class`, validated by `sig` when given.
    pub fn define_method(
        &self,
        class: ClassId,
        def: MethodDef,
        sig: Option<impl IntoDeclaration>,
    ) -> Result<(), Error> {
        let owner = self.classes().get(class)?;
        let key: MethodKey = (class, def.name.clone());

        if let Some(existing) = self.methods.get(&key).map(|e| e.value().clone()) {
            if let Some(site) = existing.site(&owner.name) {
                if site.signature.is_final {
                    return Err(final_redefinition(&site, &def.location).into());
                }
            }
        }

        let signature = match sig {
            Some(sig) => self.build_signature(class, &def, sig)?,
            None => None,
        };
        let ancestor = self.find_ancestor_method(class, &def.name);

        match &signature {
            Some(signature) => {
                if signature.mode == Mode::Abstract && !owner.is_abstract() {
                    return Err(abstract_owner(&owner.name, &def.name, &def.location).into());
                }
                if owner.flags.contains(ClassFlags::INTERFACE) && signature.mode != Mode::Abstract {
                    return Err(interface_method(&owner.name, &def.name).into());
                }
                let child = MethodSite {
                    owner: &owner.name,
                    location: &def.location,
                    signature,
                    visibility: def.visibility,
                };
                let parent = match &ancestor {
                    None => Ancestor::None,
                    Some((entry, name)) => entry.site(name).map_or(Ancestor::Unsigned, Ancestor::Signed),
                };
                check_override(self.types(), &self.ctx.config.test_mode, &child, parent)?;
            }
            None => {
                if owner.flags.contains(ClassFlags::INTERFACE) {
                    return Err(interface_method(&owner.name, &def.name).into());
                }
                if let Some((entry, name)) = &ancestor {
                    if let Some(site) = entry.site(name) {
                        if site.signature.is_final {
                            return Err(
                                final_override(&def.name, &site, &owner.name, &def.location).into()
                            );
                        }
                    }
                }
            }
        }

        let body = match &signature {
            Some(signature) => install(def.body.clone(), signature.clone(), self.ctx.clone()),
            None => def.body.clone(),
        };
        debug!(
            owner = %owner.name,
            method = %def.name,
            signed = signature.is_some(),
            "installed method"
        );
        self.methods.insert(
            key,
            Arc::new(MethodEntry {
                owner: class,
                name: def.name,
                params: def.params,
                location: def.location,
                visibility: def.visibility,
                signature,
                body,
            }),
        );
        Ok(())
    }

    /// Finalize and build the pending declaration. `Ok(None)` means a build
    /// error was accepted by the handler and the method goes in unvalidated.
    fn build_signature(
        &self,
        class: ClassId,
        def: &MethodDef,
        sig: impl IntoDeclaration,
    ) -> Result<Option<Arc<Signature>>, Error> {
        let handlers = &self.ctx.handlers;
        let declaration = sig
            .into_builder()
            .and_then(|b| b.finalize(self.ctx.config.default_checked_level))
            .map_err(|e| handlers.on_declaration_error(e))?;
        match declaration.build(self.types(), class, def) {
            Ok(signature) => Ok(Some(Arc::new(signature))),
            Err(err) => {
                handlers.on_build_error(err)?;
                debug!(method = %def.name, "signature build error accepted; installing unvalidated");
                Ok(None)
            }
        }
    }

    /// Nearest same-named method strictly above `class`, with its owner's
    /// name.
    fn find_ancestor_method(&self, class: ClassId, name: &Arc<str>) -> Option<(Arc<MethodEntry>, Arc<str>)> {
        let classes = self.classes();
        classes.ancestors(class).iter().skip(1).find_map(|&ancestor| {
            self.methods
                .get(&(ancestor, name.clone()))
                .map(|e| (e.value().clone(), classes.name(ancestor)))
        })
    }

    /// Method dispatched for `name` on instances of `class`.
    pub fn resolve(&self, class: ClassId, name: &str) -> Option<Arc<MethodEntry>> {
        let name: Arc<str> = name.into();
        self.classes()
            .ancestors(class)
            .iter()
            .find_map(|&c| self.methods.get(&(c, name.clone())).map(|e| e.value().clone()))
    }

    pub fn signature_for(&self, class: ClassId, name: &str) -> Option<Arc<Signature>> {
        self.resolve(class, name).and_then(|e| e.signature.clone())
    }

    /// Method dispatched for `name` on the class object `class` itself:
    /// extended modules first, then `Class`/`Module`.
    pub fn resolve_singleton(&self, class: ClassId, name: &str) -> Option<Arc<MethodEntry>> {
        let name: Arc<str> = name.into();
        self.classes()
            .singleton_ancestors(class)
            .iter()
            .find_map(|&c| self.methods.get(&(c, name.clone())).map(|e| e.value().clone()))
    }

    /// Call `name` on `receiver`.
    pub fn call(&self, receiver: &Value, name: &str, args: &Args) -> Result<Value, CallError> {
        let entry = match receiver {
            Value::Class(class) => self.resolve_singleton(*class, name),
            _ => self.resolve(receiver.class_id(self.classes()), name),
        };
        let Some(entry) = entry else {
            return Err(CallError::NoMethod {
                method: name.into(),
                receiver: self.inspect(receiver),
            });
        };
        trace!(method = name, owner = %self.classes().name(entry.owner), "dispatch");
        (entry.body)(receiver, args)
    }

    // =========================================================================
    // Instantiation
    // =========================================================================

    /// Create an instance of `class`, enforcing abstract-class rules.
    pub fn instantiate(&self, class: ClassId) -> Result<Value, HierarchyError> {
        let info = self.classes().get(class)?;
        if info.kind == ClassKind::Module {
            return Err(HierarchyError::ModuleInstantiation(info.name));
        }
        if info.flags.contains(ClassFlags::ENUM) {
            return Err(HierarchyError::EnumInstantiation(info.name));
        }
        if info.is_abstract() {
            return Err(HierarchyError::AbstractInstantiation(info.name));
        }
        let missing = self.missing_implementations(class);
        if !missing.is_empty() {
            return Err(HierarchyError::MissingImplementations {
                entity: info.name,
                methods: missing,
            });
        }
        Ok(Value::Object(ObjectRef::new(class)))
    }

    /// Abstract methods that still resolve to their abstract declaration.
    fn missing_implementations(&self, class: ClassId) -> Vec<String> {
        let classes = self.classes();
        let mut missing = Vec::new();
        for &ancestor in classes.ancestors(class).iter() {
            let mut names: Vec<Arc<str>> = self
                .methods
                .iter()
                .filter(|e| e.key().0 == ancestor && e.value().is_abstract())
                .map(|e| e.key().1.clone())
                .collect();
            names.sort();
            for name in names {
                let Some(resolved) = self.resolve(class, &name) else {
                    continue;
                };
                if resolved.is_abstract() && resolved.owner == ancestor {
                    missing.push(format!(
                        "  `{name}` declared in {} at {}",
                        classes.name(ancestor),
                        resolved.location
                    ));
                }
            }
        }
        missing
    }

    /// `true` if `path` may subclass any sealed entity regardless of where it
    /// was declared.
    pub fn is_sealed_allowed(&self, path: &Path) -> bool {
        self.ctx.config.is_sealed_allowed(path)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
