/*!
Type-keyed codec registry consulted when an attribute has no override.
*/

use crate::codecs::{BytesCodec, CodecProvider, JsonCodec, PrimitiveCodec, TextCodec};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

static BUILTIN: Lazy<Arc<CodecRegistry>> = Lazy::new(|| Arc::new(CodecRegistry::builtin()));

/// Exact-type lookup table from attribute type to codec
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<TypeId, (&'static str, Arc<dyn CodecProvider>)>,
}

macro_rules! register_all {
    ($registry:ident, $codec:ident, [$($ty:ty),* $(,)?]) => {
        $( $registry.register::<$ty, _>($codec::<$ty>::new()); )*
    };
}

impl CodecRegistry {
    /// A registry with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default table: text, primitives, raw bytes and JSON containers
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register::<String, _>(TextCodec);
        registry.register::<Vec<u8>, _>(BytesCodec);

        register_all!(registry, PrimitiveCodec, [
            bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
        ]);

        register_all!(registry, JsonCodec, [
            Value,
            HashMap<String, String>,
            HashMap<String, i64>,
            HashMap<String, f64>,
            HashMap<String, bool>,
            HashMap<String, Value>,
            BTreeMap<String, String>,
            BTreeMap<String, i64>,
            BTreeMap<String, f64>,
            BTreeMap<String, bool>,
            BTreeMap<String, Value>,
            Vec<String>,
            Vec<i64>,
            Vec<f64>,
            Vec<bool>,
        ]);
        registry
    }

    /// The process-wide built-in registry, shared by every declaration that
    /// does not supply its own
    pub fn shared() -> Arc<CodecRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// Register `codec` for attributes of exact type `T`, replacing any previous entry
    pub fn register<T, C>(&mut self, codec: C) -> &mut Self
    where
        T: Any,
        C: CodecProvider + 'static,
    {
        self.codecs
            .insert(TypeId::of::<T>(), (std::any::type_name::<T>(), Arc::new(codec)));
        self
    }

    /// Codec registered for the exact type `id`
    pub fn get(&self, id: TypeId) -> Option<Arc<dyn CodecProvider>> {
        self.codecs.get(&id).map(|(_, codec)| Arc::clone(codec))
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.codecs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.codecs.values().map(|(name, _)| *name).collect();
        types.sort_unstable();
        f.debug_struct("CodecRegistry").field("types", &types).finish()
    }
}
