//! Payload normalization and shallow validation.
//!
//! Multipart form data delivers structured sub-objects as JSON text, while
//! JSON bodies deliver them already structured. Everything funnels through a
//! raw field map that is normalized once at the boundary, then deserialized
//! into typed inputs. The create path parses strictly; the update path
//! leaves unparseable text in place and carries on.

use serde_json::{Map, Value};

use super::trade_debtors_model::{
    Address, Employee, KycEntry, NewTradeDebtor, TradeDebtorUpdate, VatGstDetails,
    ADDRESS_REQUIRED_ON_CREATE, ADDRESS_REQUIRED_ON_UPDATE,
};
use crate::errors::{Error, Result, ValidationError};

/// Raw request fields keyed by wire name.
pub type FieldMap = Map<String, Value>;

/// Fields that may arrive either as JSON text or structured data.
pub const STRUCTURED_FIELDS: &[&str] = &[
    "addresses",
    "employees",
    "vatGstDetails",
    "bankDetails",
    "kycDetails",
    "acDefinition",
    "limitsMargins",
];

/// How to treat a structured field whose text form is not valid JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Fail the request with INVALID_JSON_FORMAT (create path).
    Strict,
    /// Leave the field as-is and continue (update path).
    Lenient,
}

/// Parses every known structured field that arrived as text into JSON,
/// in place.
pub fn normalize_structured_fields(fields: &mut FieldMap, mode: ParseMode) -> Result<()> {
    for &name in STRUCTURED_FIELDS {
        let raw = match fields.get(name) {
            Some(Value::String(s)) => s.clone(),
            _ => continue,
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => {
                fields.insert(name.to_string(), parsed);
            }
            Err(_) => match mode {
                ParseMode::Strict => {
                    return Err(Error::Validation(ValidationError::InvalidJsonFormat(
                        name.to_string(),
                    )))
                }
                ParseMode::Lenient => {}
            },
        }
    }
    Ok(())
}

/// Canonical stored form of an account code.
pub fn normalize_account_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn take_string(fields: &mut FieldMap, name: &str) -> Option<String> {
    match fields.remove(name) {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        // Tolerate scalar non-strings from permissive clients.
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            fields.insert(name.to_string(), other);
            None
        }
    }
}

fn take_value(fields: &mut FieldMap, name: &str) -> Option<Value> {
    match fields.remove(name) {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_addresses(value: Value, required: &[&str]) -> Result<Vec<Address>> {
    let elements = match value {
        Value::Array(items) => items,
        _ => return Err(Error::Validation(ValidationError::MissingAddress)),
    };
    let mut addresses = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        let address: Address = serde_json::from_value(element).map_err(|_| {
            Error::Validation(ValidationError::InvalidAddressData {
                index,
                detail: "not a structured address".to_string(),
            })
        })?;
        address.validate(index, required)?;
        addresses.push(address);
    }
    Ok(addresses)
}

fn parse_employees(value: Value) -> Result<Vec<Employee>> {
    let elements = match value {
        Value::Array(items) => items,
        _ => return Err(Error::Validation(ValidationError::MissingEmployee)),
    };
    let mut employees = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        let employee: Employee = serde_json::from_value(element).map_err(|_| {
            Error::Validation(ValidationError::InvalidEmployeeData {
                index,
                detail: "not a structured employee".to_string(),
            })
        })?;
        employee.validate(index)?;
        employees.push(employee);
    }
    Ok(employees)
}

impl NewTradeDebtor {
    /// Builds a validated create input from a normalized field map.
    ///
    /// The map must already have gone through
    /// [`normalize_structured_fields`] with [`ParseMode::Strict`].
    pub fn from_fields(mut fields: FieldMap) -> Result<Self> {
        let account_code = non_blank(take_string(&mut fields, "accountCode"));
        let customer_name = non_blank(take_string(&mut fields, "customerName"));
        let title = non_blank(take_string(&mut fields, "title"));
        let (account_code, customer_name, title) = match (account_code, customer_name, title) {
            (Some(a), Some(c), Some(t)) => (a, c, t),
            _ => return Err(Error::Validation(ValidationError::RequiredFieldsMissing)),
        };

        let addresses = match take_value(&mut fields, "addresses") {
            Some(value) => parse_addresses(value, ADDRESS_REQUIRED_ON_CREATE)?,
            None => Vec::new(),
        };
        if addresses.is_empty() {
            return Err(Error::Validation(ValidationError::MissingAddress));
        }

        let employees = match take_value(&mut fields, "employees") {
            Some(value) => parse_employees(value)?,
            None => Vec::new(),
        };
        if employees.is_empty() {
            return Err(Error::Validation(ValidationError::MissingEmployee));
        }

        let vat_gst_details = match take_value(&mut fields, "vatGstDetails") {
            Some(value) => serde_json::from_value::<VatGstDetails>(value).map_err(|_| {
                Error::Validation(ValidationError::InvalidJsonFormat("vatGstDetails".into()))
            })?,
            None => VatGstDetails::default(),
        };

        let kyc_details = match take_value(&mut fields, "kycDetails") {
            Some(value) => serde_json::from_value::<Vec<KycEntry>>(value).map_err(|_| {
                Error::Validation(ValidationError::InvalidJsonFormat("kycDetails".into()))
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            account_code: normalize_account_code(&account_code),
            account_type: non_blank(take_string(&mut fields, "accountType")),
            title,
            customer_name,
            classification: non_blank(take_string(&mut fields, "classification")),
            remarks: non_blank(take_string(&mut fields, "remarks")),
            ac_definition: take_value(&mut fields, "acDefinition"),
            limits_margins: take_value(&mut fields, "limitsMargins"),
            bank_details: take_value(&mut fields, "bankDetails"),
            addresses,
            employees,
            vat_gst_details,
            kyc_details,
            general_documents: Vec::new(),
            directives: Default::default(),
        })
    }
}

impl TradeDebtorUpdate {
    /// Builds a validated partial update from a normalized field map.
    ///
    /// Per-element address/employee validation only runs when the list is
    /// present, and addresses use the reduced required set. A structured
    /// field that is still text here (lenient parse left it alone) is
    /// dropped from the update rather than failing it.
    pub fn from_fields(mut fields: FieldMap) -> Result<Self> {
        let addresses = match take_value(&mut fields, "addresses") {
            Some(value @ Value::Array(_)) => {
                Some(parse_addresses(value, ADDRESS_REQUIRED_ON_UPDATE)?)
            }
            _ => None,
        };

        let employees = match take_value(&mut fields, "employees") {
            Some(value @ Value::Array(_)) => Some(parse_employees(value)?),
            _ => None,
        };

        let vat_gst_details = match take_value(&mut fields, "vatGstDetails") {
            Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
            _ => None,
        };

        let kyc_details = match take_value(&mut fields, "kycDetails") {
            Some(value @ Value::Array(_)) => serde_json::from_value(value).ok(),
            _ => None,
        };

        Ok(Self {
            account_code: non_blank(take_string(&mut fields, "accountCode"))
                .map(|code| normalize_account_code(&code)),
            account_type: non_blank(take_string(&mut fields, "accountType")),
            title: non_blank(take_string(&mut fields, "title")),
            customer_name: non_blank(take_string(&mut fields, "customerName")),
            classification: non_blank(take_string(&mut fields, "classification")),
            remarks: non_blank(take_string(&mut fields, "remarks")),
            ac_definition: take_value(&mut fields, "acDefinition"),
            limits_margins: take_value(&mut fields, "limitsMargins"),
            bank_details: take_value(&mut fields, "bankDetails"),
            addresses,
            employees,
            vat_gst_details,
            kyc_details,
            directives: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields_from(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn valid_address() -> Value {
        json!({
            "streetAddress": "1 Main St",
            "city": "Bristol",
            "country": "GB",
            "zipCode": "BS1 4DJ",
            "phoneNumber1": "0117 1",
            "phoneNumber2": "0117 2",
            "email": "office@example.com",
            "telephone": "0117 3",
            "website": "https://example.com"
        })
    }

    fn valid_employee() -> Value {
        json!({
            "name": "Jo Bloggs",
            "designation": "Accounts",
            "email": "jo@example.com",
            "mobile": "0700 1"
        })
    }

    fn valid_create_fields() -> FieldMap {
        fields_from(json!({
            "accountCode": " ac1 ",
            "customerName": "X",
            "title": "Y",
            "addresses": [valid_address()],
            "employees": [valid_employee()]
        }))
    }

    #[test]
    fn strict_normalization_parses_json_text() {
        let mut fields = fields_from(json!({
            "addresses": "[{\"city\": \"Bristol\"}]",
            "bankDetails": {"iban": "GB00"}
        }));
        normalize_structured_fields(&mut fields, ParseMode::Strict).unwrap();
        assert!(fields.get("addresses").unwrap().is_array());
        assert!(fields.get("bankDetails").unwrap().is_object());
    }

    #[test]
    fn strict_normalization_rejects_bad_json_text() {
        let mut fields = fields_from(json!({ "employees": "not json" }));
        let err = normalize_structured_fields(&mut fields, ParseMode::Strict).unwrap_err();
        match err {
            Error::Validation(ValidationError::InvalidJsonFormat(field)) => {
                assert_eq!(field, "employees");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lenient_normalization_leaves_bad_json_in_place() {
        let mut fields = fields_from(json!({
            "employees": "not json",
            "addresses": "[{\"city\": \"Bath\"}]"
        }));
        normalize_structured_fields(&mut fields, ParseMode::Lenient).unwrap();
        assert_eq!(fields.get("employees").unwrap(), "not json");
        assert!(fields.get("addresses").unwrap().is_array());
    }

    #[test]
    fn create_requires_the_identity_fields() {
        for missing in ["accountCode", "customerName", "title"] {
            let mut fields = valid_create_fields();
            fields.remove(missing);
            let err = NewTradeDebtor::from_fields(fields).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::Validation(ValidationError::RequiredFieldsMissing)
                ),
                "expected REQUIRED_FIELDS_MISSING when {missing} is absent"
            );
        }
    }

    #[test]
    fn create_normalizes_the_account_code() {
        let new = NewTradeDebtor::from_fields(valid_create_fields()).unwrap();
        assert_eq!(new.account_code, "AC1");
    }

    #[test]
    fn create_rejects_missing_or_empty_addresses() {
        let mut fields = valid_create_fields();
        fields.remove("addresses");
        assert!(matches!(
            NewTradeDebtor::from_fields(fields).unwrap_err(),
            Error::Validation(ValidationError::MissingAddress)
        ));

        let mut fields = valid_create_fields();
        fields.insert("addresses".into(), json!([]));
        assert!(matches!(
            NewTradeDebtor::from_fields(fields).unwrap_err(),
            Error::Validation(ValidationError::MissingAddress)
        ));

        // Not a list counts as missing too.
        let mut fields = valid_create_fields();
        fields.insert("addresses".into(), json!({"city": "Bristol"}));
        assert!(matches!(
            NewTradeDebtor::from_fields(fields).unwrap_err(),
            Error::Validation(ValidationError::MissingAddress)
        ));
    }

    #[test]
    fn create_rejects_missing_employees() {
        let mut fields = valid_create_fields();
        fields.insert("employees".into(), json!([]));
        assert!(matches!(
            NewTradeDebtor::from_fields(fields).unwrap_err(),
            Error::Validation(ValidationError::MissingEmployee)
        ));
    }

    #[test]
    fn create_applies_the_full_address_field_set() {
        let mut fields = valid_create_fields();
        fields.insert(
            "addresses".into(),
            json!([{
                "streetAddress": "1 Main St",
                "city": "Bristol",
                "country": "GB",
                "zipCode": "BS1 4DJ"
            }]),
        );
        let err = NewTradeDebtor::from_fields(fields).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidAddressData { index: 0, .. })
        ));
    }

    #[test]
    fn create_flags_invalid_employee_elements() {
        let mut fields = valid_create_fields();
        fields.insert(
            "employees".into(),
            json!([valid_employee(), { "name": "No Email" }]),
        );
        let err = NewTradeDebtor::from_fields(fields).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidEmployeeData { index: 1, .. })
        ));
    }

    #[test]
    fn update_relaxes_the_address_field_set() {
        let fields = fields_from(json!({
            "addresses": [{
                "streetAddress": "1 Main St",
                "city": "Bristol",
                "country": "GB",
                "zipCode": "BS1 4DJ"
            }]
        }));
        let update = TradeDebtorUpdate::from_fields(fields).unwrap();
        assert_eq!(update.addresses.unwrap().len(), 1);
    }

    #[test]
    fn update_still_validates_supplied_addresses() {
        let fields = fields_from(json!({
            "addresses": [{ "streetAddress": "1 Main St" }]
        }));
        assert!(matches!(
            TradeDebtorUpdate::from_fields(fields).unwrap_err(),
            Error::Validation(ValidationError::InvalidAddressData { .. })
        ));
    }

    #[test]
    fn update_skips_absent_fields_and_unparsed_text() {
        // "employees" survived lenient normalization as text; the update
        // simply does not touch employees.
        let fields = fields_from(json!({
            "employees": "not json",
            "title": "New title"
        }));
        let update = TradeDebtorUpdate::from_fields(fields).unwrap();
        assert!(update.employees.is_none());
        assert!(update.addresses.is_none());
        assert_eq!(update.title.as_deref(), Some("New title"));
    }

    #[test]
    fn update_normalizes_a_supplied_account_code() {
        let fields = fields_from(json!({ "accountCode": "  ac9 " }));
        let update = TradeDebtorUpdate::from_fields(fields).unwrap();
        assert_eq!(update.account_code.as_deref(), Some("AC9"));
    }

    #[test]
    fn opaque_sub_objects_pass_through_unchanged() {
        let mut fields = valid_create_fields();
        fields.insert("bankDetails".into(), json!({"iban": "GB00", "bic": "X"}));
        fields.insert("limitsMargins".into(), json!({"creditLimit": 5000}));
        let new = NewTradeDebtor::from_fields(fields).unwrap();
        assert_eq!(new.bank_details.unwrap()["iban"], "GB00");
        assert_eq!(new.limits_margins.unwrap()["creditLimit"], 5000);
    }
}
