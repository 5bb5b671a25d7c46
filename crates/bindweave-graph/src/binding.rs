//! Binding descriptions: which sources feed a target, in which mode, and
//! through which converter.
//!
//! A [`Binding`] is a plain value the caller assembles and hands to the
//! service; it holds no graph state of its own. Conversion is a tagged
//! choice: no converter (types must match exactly), a single-source
//! [`ConverterBinding`], or a [`MultiConverterBinding`] combining several
//! sources into one target value.
//!
//! # Invariants
//!
//! 1. A multi-source binding always carries a multi converter; the plain
//!    constructors cannot produce more than one source.
//! 2. Source order is preserved exactly as given; the multi converter relies
//!    on positional correspondence.

use core::any::{Any, TypeId, type_name};
use std::rc::Rc;

use bindweave_core::InstanceHandle;
use smallvec::SmallVec;

/// Upper bound on the number of sources a multi-source binding may carry.
pub const MAX_MULTI_BIND_SOURCES: usize = 8;

/// Direction of value flow for a binding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BindingMode {
    /// Source changes flow to the target only.
    #[default]
    OneWay,
    /// Changes flow both ways; source and target form a group.
    TwoWay,
}

/// Value conversion for a single-source binding.
///
/// `convert` is mandatory; `convert_back` exists only for converters that
/// support two-way bindings and defaults to "unsupported".
pub trait ConverterBinding {
    fn source_type(&self) -> TypeId;
    fn target_type(&self) -> TypeId;
    fn source_type_name(&self) -> &'static str;
    fn target_type_name(&self) -> &'static str;

    /// Convert a source value into a target value. Returns `None` when the
    /// supplied value is not of the source type.
    fn convert(&self, value: &dyn Any) -> Option<Box<dyn Any>>;

    /// Reverse conversion used when the binding is two-way. Returns `None`
    /// when unsupported or when the value is not of the target type.
    fn convert_back(&self, _value: &dyn Any) -> Option<Box<dyn Any>> {
        None
    }

    /// Whether this converter can service a two-way binding.
    fn supports_two_way(&self) -> bool {
        false
    }
}

/// Value conversion combining several source values into one target value.
///
/// Only one-way bindings may use a multi converter.
pub trait MultiConverterBinding {
    fn source_types(&self) -> &[TypeId];
    fn target_type(&self) -> TypeId;
    fn target_type_name(&self) -> &'static str;

    /// Combine the source values (positionally matching the binding's source
    /// order) into a target value. Returns `None` on any type mismatch.
    fn convert(&self, values: &[Box<dyn Any>]) -> Option<Box<dyn Any>>;
}

struct FnConverter<S, T, F> {
    convert: F,
    _marker: core::marker::PhantomData<fn(&S) -> T>,
}

impl<S, T, F> ConverterBinding for FnConverter<S, T, F>
where
    S: 'static,
    T: 'static,
    F: Fn(&S) -> T,
{
    fn source_type(&self) -> TypeId {
        TypeId::of::<S>()
    }

    fn target_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn source_type_name(&self) -> &'static str {
        type_name::<S>()
    }

    fn target_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn convert(&self, value: &dyn Any) -> Option<Box<dyn Any>> {
        let value = value.downcast_ref::<S>()?;
        Some(Box::new((self.convert)(value)))
    }
}

struct FnTwoWayConverter<S, T, F, B> {
    convert: F,
    convert_back: B,
    _marker: core::marker::PhantomData<fn(&S) -> T>,
}

impl<S, T, F, B> ConverterBinding for FnTwoWayConverter<S, T, F, B>
where
    S: 'static,
    T: 'static,
    F: Fn(&S) -> T,
    B: Fn(&T) -> S,
{
    fn source_type(&self) -> TypeId {
        TypeId::of::<S>()
    }

    fn target_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn source_type_name(&self) -> &'static str {
        type_name::<S>()
    }

    fn target_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn convert(&self, value: &dyn Any) -> Option<Box<dyn Any>> {
        let value = value.downcast_ref::<S>()?;
        Some(Box::new((self.convert)(value)))
    }

    fn convert_back(&self, value: &dyn Any) -> Option<Box<dyn Any>> {
        let value = value.downcast_ref::<T>()?;
        Some(Box::new((self.convert_back)(value)))
    }

    fn supports_two_way(&self) -> bool {
        true
    }
}

struct FnMultiConverter2<A, B, T, F> {
    source_types: [TypeId; 2],
    convert: F,
    _marker: core::marker::PhantomData<fn(&A, &B) -> T>,
}

impl<A, B, T, F> MultiConverterBinding for FnMultiConverter2<A, B, T, F>
where
    A: 'static,
    B: 'static,
    T: 'static,
    F: Fn(&A, &B) -> T,
{
    fn source_types(&self) -> &[TypeId] {
        &self.source_types
    }

    fn target_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn target_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn convert(&self, values: &[Box<dyn Any>]) -> Option<Box<dyn Any>> {
        let [a, b] = values else {
            return None;
        };
        let a = a.downcast_ref::<A>()?;
        let b = b.downcast_ref::<B>()?;
        Some(Box::new((self.convert)(a, b)))
    }
}

struct FnMultiConverter3<A, B, C, T, F> {
    source_types: [TypeId; 3],
    convert: F,
    _marker: core::marker::PhantomData<fn(&A, &B, &C) -> T>,
}

impl<A, B, C, T, F> MultiConverterBinding for FnMultiConverter3<A, B, C, T, F>
where
    A: 'static,
    B: 'static,
    C: 'static,
    T: 'static,
    F: Fn(&A, &B, &C) -> T,
{
    fn source_types(&self) -> &[TypeId] {
        &self.source_types
    }

    fn target_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn target_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn convert(&self, values: &[Box<dyn Any>]) -> Option<Box<dyn Any>> {
        let [a, b, c] = values else {
            return None;
        };
        let a = a.downcast_ref::<A>()?;
        let b = b.downcast_ref::<B>()?;
        let c = c.downcast_ref::<C>()?;
        Some(Box::new((self.convert)(a, b, c)))
    }
}

/// One-way converter from a closure.
pub fn converter<S, T, F>(convert: F) -> Rc<dyn ConverterBinding>
where
    S: 'static,
    T: 'static,
    F: Fn(&S) -> T + 'static,
{
    Rc::new(FnConverter {
        convert,
        _marker: core::marker::PhantomData,
    })
}

/// Two-way converter from a forward and a backward closure.
pub fn two_way_converter<S, T, F, B>(convert: F, convert_back: B) -> Rc<dyn ConverterBinding>
where
    S: 'static,
    T: 'static,
    F: Fn(&S) -> T + 'static,
    B: Fn(&T) -> S + 'static,
{
    Rc::new(FnTwoWayConverter {
        convert,
        convert_back,
        _marker: core::marker::PhantomData,
    })
}

/// Two-source multi converter from a closure.
pub fn multi_converter2<A, B, T, F>(convert: F) -> Rc<dyn MultiConverterBinding>
where
    A: 'static,
    B: 'static,
    T: 'static,
    F: Fn(&A, &B) -> T + 'static,
{
    Rc::new(FnMultiConverter2 {
        source_types: [TypeId::of::<A>(), TypeId::of::<B>()],
        convert,
        _marker: core::marker::PhantomData,
    })
}

/// Three-source multi converter from a closure.
pub fn multi_converter3<A, B, C, T, F>(convert: F) -> Rc<dyn MultiConverterBinding>
where
    A: 'static,
    B: 'static,
    C: 'static,
    T: 'static,
    F: Fn(&A, &B, &C) -> T + 'static,
{
    Rc::new(FnMultiConverter3 {
        source_types: [TypeId::of::<A>(), TypeId::of::<B>(), TypeId::of::<C>()],
        convert,
        _marker: core::marker::PhantomData,
    })
}

/// The conversion attached to a binding, if any.
#[derive(Clone)]
pub enum Converter {
    /// Single-source value conversion.
    Single(Rc<dyn ConverterBinding>),
    /// Multi-source combination; implies a multi-source one-way binding.
    Multi(Rc<dyn MultiConverterBinding>),
}

impl core::fmt::Debug for Converter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Single(c) => f
                .debug_struct("Converter::Single")
                .field("source", &c.source_type_name())
                .field("target", &c.target_type_name())
                .finish(),
            Self::Multi(c) => f
                .debug_struct("Converter::Multi")
                .field("sources", &c.source_types().len())
                .field("target", &c.target_type_name())
                .finish(),
        }
    }
}

/// A binding description: sources, mode, and optional conversion.
#[derive(Clone, Debug, Default)]
pub struct Binding {
    sources: SmallVec<[InstanceHandle; 4]>,
    mode: BindingMode,
    converter: Option<Converter>,
}

impl Binding {
    /// The empty binding; setting it on a target clears any existing binding.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// One-way binding from a single source, no conversion.
    #[must_use]
    pub fn new(source: InstanceHandle) -> Self {
        Self::with_mode(source, BindingMode::OneWay)
    }

    /// Single-source binding with an explicit mode, no conversion.
    #[must_use]
    pub fn with_mode(source: InstanceHandle, mode: BindingMode) -> Self {
        let mut sources = SmallVec::new();
        sources.push(source);
        Self {
            sources,
            mode,
            converter: None,
        }
    }

    /// Single-source binding through a converter.
    #[must_use]
    pub fn converted(
        source: InstanceHandle,
        mode: BindingMode,
        converter: Rc<dyn ConverterBinding>,
    ) -> Self {
        let mut sources = SmallVec::new();
        sources.push(source);
        Self {
            sources,
            mode,
            converter: Some(Converter::Single(converter)),
        }
    }

    /// Multi-source one-way binding through a multi converter.
    ///
    /// Source order must match the converter's positional expectations.
    #[must_use]
    pub fn multi(sources: &[InstanceHandle], converter: Rc<dyn MultiConverterBinding>) -> Self {
        Self {
            sources: SmallVec::from_slice(sources),
            mode: BindingMode::OneWay,
            converter: Some(Converter::Multi(converter)),
        }
    }

    /// The source handles, in binding order.
    #[must_use]
    pub fn sources(&self) -> &[InstanceHandle] {
        &self.sources
    }

    #[must_use]
    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    #[must_use]
    pub fn converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    /// Whether every source handle is non-invalid. An empty binding counts
    /// as valid (it means "clear").
    #[must_use]
    pub fn has_valid_source_handles(&self) -> bool {
        self.sources.iter().all(|h| h.is_valid())
    }

    /// Whether `handle` appears among the sources.
    #[must_use]
    pub fn contains_source(&self, handle: InstanceHandle) -> bool {
        self.sources.contains(&handle)
    }
}
