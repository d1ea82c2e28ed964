//! Schema Registry
//!
//! Declares the shape of every collection the store knows about: field types,
//! enumerated value sets, defaults, uniqueness, and references between
//! entities. Collections are a closed set resolved at compile time through
//! [`EntityKind`]; [`EntityKind::resolve`] is the single runtime path for
//! dynamic collection names.

use crate::error::{Result, StoreError};
use serde_json::Value;

use crate::store::Document;

/// The registered entity kinds. One variant per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Reading,
    Payment,
    Product,
    Livestream,
    Order,
}

/// Field value classification used by descriptor-driven validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Timestamp,
    Reference,
    List,
    Object,
}

/// Default applied when an inserted document omits the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Text(&'static str),
    Number(i64),
    Boolean(bool),
}

impl DefaultValue {
    fn to_value(self) -> Value {
        match self {
            DefaultValue::Text(s) => Value::String(s.to_string()),
            DefaultValue::Number(n) => Value::from(n),
            DefaultValue::Boolean(b) => Value::Bool(b),
        }
    }
}

/// Declaration of a single document field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub unique: bool,
    pub default: Option<DefaultValue>,
    /// Permitted string values; empty means unconstrained.
    pub values: &'static [&'static str],
    /// Entity the field points at, for populate expansion.
    pub reference: Option<EntityKind>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl FieldSpec {
    const fn new(name: &'static str, ty: FieldType) -> Self {
        FieldSpec {
            name,
            ty,
            required: false,
            unique: false,
            default: None,
            values: &[],
            reference: None,
            min: None,
            max: None,
        }
    }

    const fn text(name: &'static str) -> Self {
        Self::new(name, FieldType::Text)
    }

    const fn number(name: &'static str) -> Self {
        Self::new(name, FieldType::Number)
    }

    const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    const fn timestamp(name: &'static str) -> Self {
        Self::new(name, FieldType::Timestamp)
    }

    const fn reference(name: &'static str, target: EntityKind) -> Self {
        let mut spec = Self::new(name, FieldType::Reference);
        spec.reference = Some(target);
        spec
    }

    const fn list(name: &'static str) -> Self {
        Self::new(name, FieldType::List)
    }

    const fn object(name: &'static str) -> Self {
        Self::new(name, FieldType::Object)
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.values = values;
        self
    }

    const fn default_text(mut self, value: &'static str) -> Self {
        self.default = Some(DefaultValue::Text(value));
        self
    }

    const fn default_number(mut self, value: i64) -> Self {
        self.default = Some(DefaultValue::Number(value));
        self
    }

    const fn default_bool(mut self, value: bool) -> Self {
        self.default = Some(DefaultValue::Boolean(value));
        self
    }

    const fn range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    const fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }
}

/// Full declaration of a collection.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDescriptor {
    pub entity: &'static str,
    pub collection: &'static str,
    pub fields: &'static [FieldSpec],
}

impl SchemaDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

const USER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("username").required().unique(),
    FieldSpec::text("email").required().unique(),
    FieldSpec::text("password").required(),
    FieldSpec::text("fullName"),
    FieldSpec::text("role")
        .one_of(&["admin", "user", "reader", "client"])
        .default_text("user"),
    FieldSpec::text("profileImage"),
    FieldSpec::text("bio"),
    FieldSpec::boolean("isVerified").default_bool(false),
    FieldSpec::boolean("isOnline").default_bool(false),
    FieldSpec::text("stripeCustomerId"),
    FieldSpec::text("stripeConnectId"),
];

const READING_FIELDS: &[FieldSpec] = &[
    FieldSpec::reference("clientId", EntityKind::User).required(),
    FieldSpec::reference("readerId", EntityKind::User).required(),
    FieldSpec::text("type")
        .one_of(&["video", "voice", "chat"])
        .required(),
    FieldSpec::text("status")
        .one_of(&[
            "requested",
            "accepted",
            "declined",
            "completed",
            "cancelled",
            "scheduled",
            "in_progress",
            "waiting_payment",
            "payment_completed",
        ])
        .default_text("requested"),
    FieldSpec::text("notes"),
    FieldSpec::number("rating").range(0, 5),
    FieldSpec::text("review"),
    // minutes
    FieldSpec::number("duration").default_number(0),
    // minor currency units
    FieldSpec::number("totalAmount").default_number(0),
    FieldSpec::text("roomId"),
    FieldSpec::timestamp("scheduledAt"),
    FieldSpec::timestamp("completedAt"),
    FieldSpec::text("clientNotes"),
];

const PAYMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::reference("readingId", EntityKind::Reading),
    FieldSpec::reference("userId", EntityKind::User).required(),
    FieldSpec::reference("readerId", EntityKind::User),
    FieldSpec::number("amount").required(),
    FieldSpec::text("status")
        .one_of(&["pending", "completed", "failed", "refunded"])
        .default_text("pending"),
    FieldSpec::text("type")
        .one_of(&["reading", "gift", "product", "subscription"])
        .required(),
    FieldSpec::text("stripePaymentId"),
    // readerShare + platformFee reconcile to amount; the split is asserted
    // by the calling layer, not enforced here
    FieldSpec::number("readerShare"),
    FieldSpec::number("platformFee"),
];

const PRODUCT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name").required(),
    FieldSpec::text("description").required(),
    FieldSpec::number("price").required(),
    FieldSpec::text("imageUrl"),
    FieldSpec::text("category").required(),
    FieldSpec::number("inventory").default_number(0).min(0),
    FieldSpec::boolean("isFeatured").default_bool(false),
    FieldSpec::reference("sellerId", EntityKind::User),
];

const LIVESTREAM_FIELDS: &[FieldSpec] = &[
    FieldSpec::reference("hostId", EntityKind::User).required(),
    FieldSpec::text("title").required(),
    FieldSpec::text("description"),
    FieldSpec::text("status")
        .one_of(&["scheduled", "created", "live", "ended", "idle"])
        .default_text("scheduled"),
    FieldSpec::timestamp("scheduledAt"),
    FieldSpec::timestamp("startedAt"),
    FieldSpec::timestamp("endedAt"),
    FieldSpec::text("thumbnailUrl"),
    FieldSpec::number("viewCount").default_number(0),
    FieldSpec::text("roomId"),
];

const ORDER_FIELDS: &[FieldSpec] = &[
    FieldSpec::reference("userId", EntityKind::User).required(),
    FieldSpec::list("items").required(),
    FieldSpec::number("totalAmount").required(),
    FieldSpec::text("status")
        .one_of(&["pending", "paid", "shipped", "delivered", "cancelled"])
        .default_text("pending"),
    FieldSpec::object("shippingAddress"),
    FieldSpec::text("trackingNumber"),
    FieldSpec::text("stripePaymentId"),
];

const USER_SCHEMA: SchemaDescriptor = SchemaDescriptor {
    entity: "User",
    collection: "users",
    fields: USER_FIELDS,
};

const READING_SCHEMA: SchemaDescriptor = SchemaDescriptor {
    entity: "Reading",
    collection: "readings",
    fields: READING_FIELDS,
};

const PAYMENT_SCHEMA: SchemaDescriptor = SchemaDescriptor {
    entity: "Payment",
    collection: "payments",
    fields: PAYMENT_FIELDS,
};

const PRODUCT_SCHEMA: SchemaDescriptor = SchemaDescriptor {
    entity: "Product",
    collection: "products",
    fields: PRODUCT_FIELDS,
};

const LIVESTREAM_SCHEMA: SchemaDescriptor = SchemaDescriptor {
    entity: "Livestream",
    collection: "livestreams",
    fields: LIVESTREAM_FIELDS,
};

const ORDER_SCHEMA: SchemaDescriptor = SchemaDescriptor {
    entity: "Order",
    collection: "orders",
    fields: ORDER_FIELDS,
};

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::User,
        EntityKind::Reading,
        EntityKind::Payment,
        EntityKind::Product,
        EntityKind::Livestream,
        EntityKind::Order,
    ];

    pub fn descriptor(&self) -> &'static SchemaDescriptor {
        match self {
            EntityKind::User => &USER_SCHEMA,
            EntityKind::Reading => &READING_SCHEMA,
            EntityKind::Payment => &PAYMENT_SCHEMA,
            EntityKind::Product => &PRODUCT_SCHEMA,
            EntityKind::Livestream => &LIVESTREAM_SCHEMA,
            EntityKind::Order => &ORDER_SCHEMA,
        }
    }

    pub fn entity_name(&self) -> &'static str {
        self.descriptor().entity
    }

    pub fn collection(&self) -> &'static str {
        self.descriptor().collection
    }

    /// Runtime fallback for dynamic collection names. Matches the entity name
    /// or the collection name, case-insensitively; nothing else (no
    /// pluralization, no snake_case mapping).
    pub fn resolve(name: &str) -> Option<EntityKind> {
        Self::ALL.into_iter().find(|kind| {
            let d = kind.descriptor();
            d.entity.eq_ignore_ascii_case(name) || d.collection.eq_ignore_ascii_case(name)
        })
    }
}

/// Apply defaults and validate a document against its schema before insert.
///
/// Unknown fields pass through untouched; documents are self-describing and
/// the registry only vouches for the fields it declares.
pub fn prepare_insert(kind: EntityKind, mut doc: Document) -> Result<Document> {
    let descriptor = kind.descriptor();

    for field in descriptor.fields {
        if !doc.contains_key(field.name) {
            if let Some(default) = field.default {
                doc.insert(field.name.to_string(), default.to_value());
                continue;
            }
            if field.required {
                return Err(StoreError::Validation {
                    collection: descriptor.collection.to_string(),
                    message: format!("required field '{}' is missing", field.name),
                });
            }
            continue;
        }

        validate_field(descriptor, field, &doc[field.name])?;
    }

    Ok(doc)
}

/// Validate the declared fields present in an update patch.
pub fn validate_patch(kind: EntityKind, patch: &Document) -> Result<()> {
    let descriptor = kind.descriptor();

    for (name, value) in patch {
        if let Some(field) = descriptor.field(name) {
            validate_field(descriptor, field, value)?;
        }
    }

    Ok(())
}

fn validate_field(
    descriptor: &SchemaDescriptor,
    field: &FieldSpec,
    value: &Value,
) -> Result<()> {
    // Null clears an optional field
    if value.is_null() {
        if field.required {
            return Err(StoreError::Validation {
                collection: descriptor.collection.to_string(),
                message: format!("required field '{}' may not be null", field.name),
            });
        }
        return Ok(());
    }

    if !field.values.is_empty() {
        match value.as_str() {
            Some(s) if field.values.contains(&s) => {}
            Some(s) => {
                return Err(StoreError::Validation {
                    collection: descriptor.collection.to_string(),
                    message: format!(
                        "'{}' is not a permitted value for '{}' (expected one of {:?})",
                        s, field.name, field.values
                    ),
                });
            }
            None => {
                return Err(StoreError::Validation {
                    collection: descriptor.collection.to_string(),
                    message: format!("field '{}' must be a string", field.name),
                });
            }
        }
    }

    if field.min.is_some() || field.max.is_some() {
        let n = value.as_f64().ok_or_else(|| StoreError::Validation {
            collection: descriptor.collection.to_string(),
            message: format!("field '{}' must be a number", field.name),
        })?;

        if let Some(min) = field.min {
            if n < min as f64 {
                return Err(StoreError::Validation {
                    collection: descriptor.collection.to_string(),
                    message: format!("field '{}' must be at least {}", field.name, min),
                });
            }
        }
        if let Some(max) = field.max {
            if n > max as f64 {
                return Err(StoreError::Validation {
                    collection: descriptor.collection.to_string(),
                    message: format!("field '{}' must be at most {}", field.name, max),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_resolve_names() {
        assert_eq!(EntityKind::resolve("User"), Some(EntityKind::User));
        assert_eq!(EntityKind::resolve("users"), Some(EntityKind::User));
        assert_eq!(EntityKind::resolve("Users"), Some(EntityKind::User));
        assert_eq!(EntityKind::resolve("livestreams"), Some(EntityKind::Livestream));
        assert_eq!(EntityKind::resolve("sessions"), None);
        assert_eq!(EntityKind::resolve(""), None);
    }

    #[test]
    fn test_defaults_applied() {
        let prepared = prepare_insert(
            EntityKind::User,
            doc(json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": "hash"
            })),
        )
        .unwrap();

        assert_eq!(prepared["role"], json!("user"));
        assert_eq!(prepared["isVerified"], json!(false));
        assert_eq!(prepared["isOnline"], json!(false));
    }

    #[test]
    fn test_required_field_missing() {
        let err = prepare_insert(EntityKind::User, doc(json!({"username": "ada"}))).unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[test]
    fn test_enum_value_rejected() {
        let err = prepare_insert(
            EntityKind::User,
            doc(json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": "hash",
                "role": "superuser"
            })),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[test]
    fn test_rating_range() {
        let base = json!({
            "clientId": "c1",
            "readerId": "r1",
            "type": "chat"
        });

        let mut ok = doc(base.clone());
        ok.insert("rating".into(), json!(5));
        assert!(prepare_insert(EntityKind::Reading, ok).is_ok());

        let mut bad = doc(base);
        bad.insert("rating".into(), json!(6));
        assert!(prepare_insert(EntityKind::Reading, bad).is_err());
    }

    #[test]
    fn test_patch_validation() {
        assert!(validate_patch(EntityKind::Product, &doc(json!({"inventory": 3}))).is_ok());
        assert!(validate_patch(EntityKind::Product, &doc(json!({"inventory": -1}))).is_err());
        assert!(validate_patch(EntityKind::Order, &doc(json!({"status": "lost"}))).is_err());
        // undeclared fields pass through
        assert!(validate_patch(EntityKind::Order, &doc(json!({"note": "x"}))).is_ok());
    }
}
