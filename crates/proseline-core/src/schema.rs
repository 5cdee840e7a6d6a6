//! Schema registry for log entries.
//!
//! Each entry kind has a static [`FieldContract`]: the fields of the kind
//! itself, composed with the shared [`CHAIN_FIELDS`] and [`COMMON_FIELDS`].
//! A new kind gets chain-field validation by appearing in [`CONTRACTS`];
//! nothing is assembled at runtime.
//!
//! Structural checks are delegated to a [`StructuralValidator`]. The
//! registry adds the one rule that spans fields: `prior` is required
//! whenever `index > 0`.

use serde_json::Value;
use std::collections::HashSet;

use crate::encoding::BinaryEncoding;
use crate::entry::EntryKind;
use crate::error::{SchemaError, UnknownKindError, ValidationError, ValidationReason};
use crate::json::{self, Object};

/// Maximum number of parents a draft may have.
pub const MAX_DRAFT_PARENTS: usize = 2;

/// Maximum length of names, device labels and mark names, in characters.
pub const MAX_NAME_CHARS: usize = 256;

/// Value constraint for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// The `kind` discriminator; must equal the contract's tag.
    KindTag,
    /// Non-negative integer.
    Index,
    /// RFC 3339 date-time string.
    Timestamp,
    /// Binary field of exactly this many bytes.
    Bytes(usize),
    /// String with a character count in `min..=max`.
    Text { min: usize, max: Option<usize> },
    /// Array of distinct digests.
    Parents { max: usize },
    /// `{start, end}` with `end > start`.
    Range,
    /// Any JSON object whose numbers are all integers.
    Object,
    Email,
    Phone,
}

/// One field of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub shape: FieldShape,
}

const fn required(name: &'static str, shape: FieldShape) -> FieldSpec {
    FieldSpec {
        name,
        required: true,
        shape,
    }
}

const fn optional(name: &'static str, shape: FieldShape) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
        shape,
    }
}

const DIGEST: FieldShape = FieldShape::Bytes(32);
const NAME: FieldShape = FieldShape::Text {
    min: 1,
    max: Some(MAX_NAME_CHARS),
};
const NOTE_TEXT: FieldShape = FieldShape::Text { min: 1, max: None };

/// Fields linking every entry into its log.
pub static CHAIN_FIELDS: [FieldSpec; 3] = [
    required("discoveryKey", FieldShape::Bytes(32)),
    required("index", FieldShape::Index),
    optional("prior", DIGEST),
];

/// Fields every entry carries regardless of kind.
pub static COMMON_FIELDS: [FieldSpec; 2] = [
    required("kind", FieldShape::KindTag),
    required("timestamp", FieldShape::Timestamp),
];

static DRAFT_FIELDS: [FieldSpec; 2] = [
    required(
        "parents",
        FieldShape::Parents {
            max: MAX_DRAFT_PARENTS,
        },
    ),
    required("text", FieldShape::Object),
];

static MARK_FIELDS: [FieldSpec; 3] = [
    required("identifier", FieldShape::Bytes(4)),
    required("name", NAME),
    required("draft", DIGEST),
];

static NOTE_FIELDS: [FieldSpec; 3] = [
    required("draft", DIGEST),
    required("range", FieldShape::Range),
    required("text", NOTE_TEXT),
];

static REPLY_FIELDS: [FieldSpec; 2] = [required("parent", DIGEST), required("text", NOTE_TEXT)];

static CORRECTION_FIELDS: [FieldSpec; 2] =
    [required("note", DIGEST), required("text", NOTE_TEXT)];

static INTRO_FIELDS: [FieldSpec; 4] = [
    required("name", NAME),
    required("device", NAME),
    optional("email", FieldShape::Email),
    optional("phone", FieldShape::Phone),
];

/// Required and optional fields of one entry kind.
#[derive(Debug, PartialEq, Eq)]
pub struct FieldContract {
    pub kind: EntryKind,
    fields: &'static [FieldSpec],
}

impl FieldContract {
    /// Every field: common, chain, then kind-specific.
    pub fn all(&self) -> impl Iterator<Item = &FieldSpec> + '_ {
        COMMON_FIELDS
            .iter()
            .chain(CHAIN_FIELDS.iter())
            .chain(self.fields.iter())
    }

    /// Fields specific to this kind.
    pub fn own(&self) -> &[FieldSpec] {
        self.fields
    }

    /// Names of required fields, sorted.
    pub fn required(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.all().filter(|f| f.required).map(|f| f.name).collect();
        names.sort_unstable();
        names
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.all().find(|f| f.name == name)
    }

    /// The contract for a kind.
    pub fn of(kind: EntryKind) -> &'static FieldContract {
        &CONTRACTS[kind as usize]
    }
}

/// Contracts indexed by [`EntryKind`] discriminant.
pub static CONTRACTS: [FieldContract; 6] = [
    FieldContract {
        kind: EntryKind::Draft,
        fields: &DRAFT_FIELDS,
    },
    FieldContract {
        kind: EntryKind::Mark,
        fields: &MARK_FIELDS,
    },
    FieldContract {
        kind: EntryKind::Note,
        fields: &NOTE_FIELDS,
    },
    FieldContract {
        kind: EntryKind::Reply,
        fields: &REPLY_FIELDS,
    },
    FieldContract {
        kind: EntryKind::Correction,
        fields: &CORRECTION_FIELDS,
    },
    FieldContract {
        kind: EntryKind::Intro,
        fields: &INTRO_FIELDS,
    },
];

/// Look up the contract for a wire tag.
pub fn describe(tag: &str) -> Result<&'static FieldContract, UnknownKindError> {
    EntryKind::parse(tag).map(FieldContract::of)
}

/// Checks a candidate object against a contract: presence, type, length,
/// pattern and uniqueness.
pub trait StructuralValidator: Send + Sync {
    fn check(&self, contract: &FieldContract, candidate: &Object) -> Result<(), ValidationError>;
}

/// Validator interpreting [`FieldShape`]s directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractValidator {
    encoding: BinaryEncoding,
}

impl ContractValidator {
    pub fn new(encoding: BinaryEncoding) -> Self {
        Self { encoding }
    }

    fn check_field(
        &self,
        contract: &FieldContract,
        spec: &FieldSpec,
        value: &Value,
    ) -> Result<(), ValidationError> {
        let name = spec.name;
        let as_str = || {
            value
                .as_str()
                .ok_or_else(|| ValidationError::wrong_type(name, "string"))
        };

        match spec.shape {
            FieldShape::KindTag => {
                let tag = as_str()?;
                if tag != contract.kind.as_str() {
                    return Err(ValidationError::new(
                        name,
                        ValidationReason::Mismatch {
                            expected: contract.kind.as_str().to_string(),
                            actual: tag.to_string(),
                        },
                    ));
                }
            }
            FieldShape::Index => {
                value
                    .as_u64()
                    .ok_or_else(|| ValidationError::wrong_type(name, "non-negative integer"))?;
            }
            FieldShape::Timestamp => {
                crate::entry::Timestamp::parse(as_str()?)
                    .map_err(|e| ValidationError::new(name, e.reason))?;
            }
            FieldShape::Bytes(len) => self.check_bytes(name, as_str()?, len)?,
            FieldShape::Text { min, max } => check_text(name, as_str()?, min, max)?,
            FieldShape::Parents { max } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| ValidationError::wrong_type(name, "array"))?;
                if items.len() > max {
                    return Err(ValidationError::new(
                        name,
                        ValidationReason::TooMany {
                            max,
                            actual: items.len(),
                        },
                    ));
                }
                let mut seen = HashSet::with_capacity(items.len());
                for item in items {
                    let text = item
                        .as_str()
                        .ok_or_else(|| ValidationError::wrong_type(name, "string"))?;
                    self.check_bytes(name, text, 32)?;
                    if !seen.insert(text) {
                        return Err(ValidationError::new(name, ValidationReason::Duplicate));
                    }
                }
            }
            FieldShape::Range => {
                let range = json::as_object(value, name)?;
                json::deny_unknown(range, &["start", "end"])?;
                let start = json::uint(range, "start")?;
                let end = json::uint(range, "end")?;
                if end < 1 || end <= start {
                    return Err(ValidationError::new(
                        name,
                        ValidationReason::Inconsistent("end must be greater than start"),
                    ));
                }
            }
            FieldShape::Object => {
                json::as_object(value, name)?;
                if !integers_only(value) {
                    return Err(ValidationError::wrong_type(
                        name,
                        "object with integer numbers only",
                    ));
                }
            }
            FieldShape::Email => {
                if !is_email(as_str()?) {
                    return Err(ValidationError::new(
                        name,
                        ValidationReason::Pattern("local@domain"),
                    ));
                }
            }
            FieldShape::Phone => {
                if !is_phone(as_str()?) {
                    return Err(ValidationError::new(
                        name,
                        ValidationReason::Pattern("^\\+[0-9]+$"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_bytes(&self, name: &str, text: &str, len: usize) -> Result<(), ValidationError> {
        self.encoding
            .check_exact(text, len)
            .map_err(|e| ValidationError::new(name, ValidationReason::Encoding(e)))
    }
}

impl StructuralValidator for ContractValidator {
    fn check(&self, contract: &FieldContract, candidate: &Object) -> Result<(), ValidationError> {
        for spec in contract.all() {
            match candidate.get(spec.name) {
                Some(value) => self.check_field(contract, spec, value)?,
                None if spec.required => return Err(ValidationError::missing(spec.name)),
                None => {}
            }
        }

        let allowed: Vec<&str> = contract.all().map(|f| f.name).collect();
        json::deny_unknown(candidate, &allowed)
    }
}

fn check_text(name: &str, text: &str, min: usize, max: Option<usize>) -> Result<(), ValidationError> {
    let actual = text.chars().count();
    if actual < min || max.is_some_and(|max| actual > max) {
        return Err(ValidationError::new(
            name,
            ValidationReason::Length { min, max, actual },
        ));
    }
    Ok(())
}

/// Floats have no canonical encoding, so they cannot be signed.
fn integers_only(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_u64() || n.is_i64(),
        Value::Array(items) => items.iter().all(integers_only),
        Value::Object(map) => map.values().all(integers_only),
        _ => true,
    }
}

fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !text.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_phone(text: &str) -> bool {
    text.strip_prefix('+')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Registry of entry contracts, parameterized by the structural validator.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry<V = ContractValidator> {
    validator: V,
}

impl SchemaRegistry<ContractValidator> {
    /// A registry using the built-in validator for `encoding`.
    pub fn new(encoding: BinaryEncoding) -> Self {
        Self {
            validator: ContractValidator::new(encoding),
        }
    }
}

impl<V: StructuralValidator> SchemaRegistry<V> {
    /// A registry delegating structural checks to `validator`.
    pub fn with_validator(validator: V) -> Self {
        Self { validator }
    }

    pub fn describe(&self, tag: &str) -> Result<&'static FieldContract, UnknownKindError> {
        describe(tag)
    }

    /// Validate a candidate as an entry of `kind`.
    pub fn validate(&self, kind: EntryKind, candidate: &Value) -> Result<(), ValidationError> {
        let object = json::as_object(candidate, "$")?;
        self.validator.check(FieldContract::of(kind), object)?;

        let index = json::uint(object, "index")?;
        if index > 0 && !object.contains_key("prior") {
            return Err(ValidationError::missing("prior"));
        }
        Ok(())
    }

    /// Validate a candidate whose kind is taken from its `kind` tag.
    pub fn validate_entry(&self, candidate: &Value) -> Result<EntryKind, SchemaError> {
        let object = json::as_object(candidate, "$")?;
        let kind = EntryKind::parse(json::string(object, "kind")?)?;
        self.validate(kind, candidate)?;
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn digest(byte: u8) -> String {
        hex::encode([byte; 32])
    }

    fn intro() -> Value {
        json!({
            "kind": "intro",
            "timestamp": "2024-03-01T12:00:00Z",
            "discoveryKey": digest(1),
            "index": 1,
            "prior": digest(2),
            "name": "Kyle E. Mitchell",
            "device": "laptop",
        })
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(BinaryEncoding::Hex)
    }

    #[test]
    fn test_every_kind_inherits_chain_fields() {
        for kind in EntryKind::ALL {
            let contract = FieldContract::of(kind);
            assert_eq!(contract.kind, kind);
            for chain in &CHAIN_FIELDS {
                assert_eq!(contract.field(chain.name), Some(chain));
            }
        }
    }

    #[test]
    fn test_describe() {
        let contract = describe("intro").unwrap();
        assert_eq!(
            contract.required(),
            vec!["device", "discoveryKey", "index", "kind", "name", "timestamp"]
        );
        assert!(!contract.field("email").unwrap().required);
        assert_eq!(describe("poll"), Err(UnknownKindError("poll".into())));
    }

    #[test]
    fn test_valid_intro() {
        assert_eq!(registry().validate_entry(&intro()), Ok(EntryKind::Intro));
    }

    #[test]
    fn test_missing_required_fields_named() {
        let contract = FieldContract::of(EntryKind::Intro);
        for name in contract.required() {
            let mut candidate = intro();
            candidate.as_object_mut().unwrap().remove(name);
            let err = registry().validate(EntryKind::Intro, &candidate).unwrap_err();
            assert_eq!(err.field, name);
            assert_eq!(err.reason, ValidationReason::Missing);
        }
    }

    #[test]
    fn test_prior_required_after_first() {
        let mut candidate = intro();
        candidate.as_object_mut().unwrap().remove("prior");
        assert_eq!(
            registry().validate(EntryKind::Intro, &candidate),
            Err(ValidationError::missing("prior"))
        );

        candidate["index"] = json!(0);
        assert!(registry().validate(EntryKind::Intro, &candidate).is_ok());
    }

    #[test]
    fn test_name_length_bounds() {
        let mut candidate = intro();
        candidate["name"] = json!("x".repeat(256));
        assert!(registry().validate_entry(&candidate).is_ok());

        candidate["name"] = json!("x".repeat(257));
        let err = registry().validate_entry(&candidate).unwrap_err();
        assert_eq!(err.field(), Some("name"));

        candidate["name"] = json!("");
        assert_eq!(registry().validate_entry(&candidate).unwrap_err().field(), Some("name"));
    }

    #[test]
    fn test_unexpected_field_rejected() {
        let mut candidate = intro();
        candidate["avatar"] = json!("x");
        let err = registry().validate_entry(&candidate).unwrap_err();
        assert_eq!(err.field(), Some("avatar"));
    }

    #[test]
    fn test_kind_tag_must_match_contract() {
        let err = registry().validate(EntryKind::Mark, &intro()).unwrap_err();
        assert_eq!(err.field, "kind");
    }

    #[test]
    fn test_contact_hints() {
        let mut candidate = intro();
        candidate["email"] = json!("kyle@example.com");
        candidate["phone"] = json!("+15555550100");
        assert!(registry().validate_entry(&candidate).is_ok());

        candidate["phone"] = json!("555-0100");
        assert_eq!(registry().validate_entry(&candidate).unwrap_err().field(), Some("phone"));

        candidate["phone"] = json!("+1");
        candidate["email"] = json!("not an email");
        assert_eq!(registry().validate_entry(&candidate).unwrap_err().field(), Some("email"));
    }

    #[test]
    fn test_draft_parent_limits() {
        let mut draft = json!({
            "kind": "draft",
            "timestamp": "2024-03-01T12:00:00Z",
            "discoveryKey": digest(1),
            "index": 0,
            "parents": [digest(4), digest(5)],
            "text": { "ops": [] },
        });
        assert!(registry().validate_entry(&draft).is_ok());

        draft["parents"] = json!([digest(4), digest(5), digest(6)]);
        let err = registry().validate(EntryKind::Draft, &draft).unwrap_err();
        assert_eq!(err.field, "parents");
        assert!(matches!(err.reason, ValidationReason::TooMany { max: 2, actual: 3 }));

        draft["parents"] = json!([digest(4), digest(4)]);
        let err = registry().validate(EntryKind::Draft, &draft).unwrap_err();
        assert_eq!(err.field, "parents");
        assert_eq!(err.reason, ValidationReason::Duplicate);
    }

    #[test]
    fn test_draft_text_refuses_floats() {
        let mut draft = json!({
            "kind": "draft",
            "timestamp": "2024-03-01T12:00:00Z",
            "discoveryKey": digest(1),
            "index": 0,
            "parents": [],
            "text": { "zoom": 2, "ops": [{ "retain": -3 }] },
        });
        assert!(registry().validate_entry(&draft).is_ok());

        draft["text"] = json!({ "zoom": 1.5 });
        let err = registry().validate(EntryKind::Draft, &draft).unwrap_err();
        assert_eq!(err.field, "text");

        draft["text"] = json!({ "ops": [{ "insert": "a", "weight": 0.25 }] });
        let err = registry().validate(EntryKind::Draft, &draft).unwrap_err();
        assert_eq!(err.field, "text");
    }

    #[test]
    fn test_note_range() {
        let mut note = json!({
            "kind": "note",
            "timestamp": "2024-03-01T12:00:00Z",
            "discoveryKey": digest(1),
            "index": 0,
            "draft": digest(3),
            "range": { "start": 0, "end": 1 },
            "text": "typo",
        });
        assert!(registry().validate_entry(&note).is_ok());

        note["range"] = json!({ "start": 3, "end": 3 });
        assert_eq!(registry().validate_entry(&note).unwrap_err().field(), Some("range"));

        note["range"] = json!({ "start": 0, "end": 2 });
        note["text"] = json!("");
        assert_eq!(registry().validate_entry(&note).unwrap_err().field(), Some("text"));
    }

    #[test]
    fn test_binary_length_enforced_per_encoding() {
        let mut candidate = intro();
        candidate["discoveryKey"] = json!(hex::encode([1u8; 31]));
        assert_eq!(
            registry().validate_entry(&candidate).unwrap_err().field(),
            Some("discoveryKey")
        );

        let base64 = SchemaRegistry::new(BinaryEncoding::Base64);
        assert_eq!(base64.validate_entry(&intro()).unwrap_err().field(), Some("discoveryKey"));
    }

    struct RejectAll;

    impl StructuralValidator for RejectAll {
        fn check(&self, _: &FieldContract, _: &Object) -> Result<(), ValidationError> {
            Err(ValidationError::new("$", ValidationReason::Inconsistent("rejected")))
        }
    }

    #[test]
    fn test_injected_validator_is_used() {
        let registry = SchemaRegistry::with_validator(RejectAll);
        assert_eq!(registry.validate_entry(&intro()).unwrap_err().field(), Some("$"));
    }
}
