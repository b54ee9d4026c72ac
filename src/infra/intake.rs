//! Maps the flat lead payload posted by the form tool into domain types.
//!
//! The form tool is loose with types: numbers arrive as strings, empty
//! strings or `null`. Numeric fields never reject the payload; anything that
//! does not read as a number becomes 0 (or "not supplied" for quotes).

use std::fmt;

use serde::{
    de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor},
    Deserialize, Deserializer,
};

use serde_json::{Map, Value};

use crate::domain::{intake::NewLead, AvmQuotes, Lead, PropertyAttributes};

/// Other spellings accepted for each field, in order of preference after the
/// field's own name. The form tool still sends the legacy Italian columns.
const KEY_SPELLINGS: &[(&str, &[&str])] = &[
    ("first_name", &["lead_first_name", "lead_nome"]),
    ("last_name", &["lead_last_name", "lead_cognome"]),
    ("email", &["lead_email"]),
    ("phone", &["lead_phone", "lead_telefono"]),
    ("address", &["indirizzo_completo"]),
    ("street_number", &["numero_civico"]),
    ("property_type", &["tipo_immobile"]),
    ("condition", &["condizioni_immobile"]),
    ("surface_sqm", &["superficie_mq"]),
    ("rooms", &["numero_locali"]),
    ("bathrooms", &["numero_bagni"]),
    ("outdoor_areas", &["aree_esterne"]),
    ("appurtenances", &["pertinenze"]),
    ("year_built", &["anno_costruzione"]),
    ("floor", &["piano_immobile"]),
    ("elevator", &["ascensore"]),
    ("avm_agent_min", &["avm_agent_pricing_min"]),
    ("avm_agent_max", &["avm_agent_pricing_max"]),
    ("avm_insights_min", &["avm_immobiliare_insights_min"]),
    ("avm_insights_max", &["avm_immobiliare_insights_max"]),
];

#[derive(Debug, Default, Deserialize)]
pub struct LeadDto {
    #[serde(default, deserialize_with = "text")]
    pub first_name: String,
    #[serde(default, deserialize_with = "text")]
    pub last_name: String,
    #[serde(default, deserialize_with = "text")]
    pub email: String,
    #[serde(default, deserialize_with = "opt_text")]
    pub phone: Option<String>,

    #[serde(default, deserialize_with = "text")]
    pub address: String,
    #[serde(default, deserialize_with = "opt_text")]
    pub street_number: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "number")]
    pub surface_sqm: f64,
    #[serde(default, deserialize_with = "count")]
    pub rooms: Option<u32>,
    #[serde(default, deserialize_with = "count")]
    pub bathrooms: Option<u32>,
    #[serde(default, deserialize_with = "opt_text")]
    pub outdoor_areas: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub appurtenances: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub year_built: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub floor: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub elevator: Option<String>,

    #[serde(default, deserialize_with = "quote")]
    pub avm_agent_min: Option<f64>,
    #[serde(default, deserialize_with = "quote")]
    pub avm_agent_max: Option<f64>,
    #[serde(default, deserialize_with = "quote")]
    pub avm_insights_min: Option<f64>,
    #[serde(default, deserialize_with = "quote")]
    pub avm_insights_max: Option<f64>,
}

impl LeadDto {
    pub fn into_new_lead(self, raw_payload: Option<Value>) -> NewLead {
        NewLead {
            lead: Lead {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                phone: self.phone,
            },
            attributes: PropertyAttributes {
                address: self.address,
                street_number: self.street_number,
                property_type: self.property_type,
                condition: self.condition,
                surface_sqm: self.surface_sqm,
                rooms: self.rooms,
                bathrooms: self.bathrooms,
                outdoor_areas: self.outdoor_areas,
                appurtenances: self.appurtenances,
                year_built: self.year_built,
                floor: self.floor,
                elevator: self.elevator,
            },
            avm: AvmQuotes {
                agent_min: self.avm_agent_min,
                agent_max: self.avm_agent_max,
                insights_min: self.avm_insights_min,
                insights_max: self.avm_insights_max,
            },
            raw_payload,
        }
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

/// Folds every accepted spelling into the field's own key. The first
/// non-blank spelling wins; the rest are dropped.
fn canonical_keys(mut fields: Map<String, Value>) -> Map<String, Value> {
    for (key, spellings) in KEY_SPELLINGS {
        for spelling in *spellings {
            if let Some(value) = fields.remove(*spelling) {
                if is_blank(fields.get(*key)) && !is_blank(Some(&value)) {
                    fields.insert((*key).to_string(), value);
                }
            }
        }
    }
    fields
}

/// Parses a webhook body. Only a non-object body is rejected.
pub fn parse_lead(payload: Value) -> Result<NewLead, String> {
    let Value::Object(fields) = &payload else {
        return Err("lead payload must be a JSON object".to_string());
    };
    let dto: LeadDto = serde_json::from_value(Value::Object(canonical_keys(fields.clone())))
        .map_err(|err| err.to_string())?;
    Ok(dto.into_new_lead(Some(payload)))
}

/// Any scalar the form tool may send.
enum Loose {
    Number(f64),
    Text(String),
    Empty,
}

impl Loose {
    fn as_number(&self) -> Option<f64> {
        match self {
            Loose::Number(value) => Some(*value),
            Loose::Text(text) => parse_decimal(text),
            Loose::Empty => None,
        }
        .filter(|value| value.is_finite())
    }

    fn into_text(self) -> Option<String> {
        match self {
            Loose::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Some(format!("{}", value as i64))
            }
            Loose::Number(value) => Some(value.to_string()),
            Loose::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Loose::Empty => None,
        }
    }
}

/// Accepts `1234.5`, `1234,5` and surrounding whitespace.
fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
}

struct LooseVisitor;

impl<'de> Visitor<'de> for LooseVisitor {
    type Value = Loose;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string, number or null")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(Loose::Empty)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Loose::Number(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Loose::Number(value as f64))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(Loose::Number(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(Loose::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(Loose::Text(value))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Loose::Empty)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Loose::Empty)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(LooseVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Loose::Empty)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Loose::Empty)
    }
}

fn loose<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Loose, D::Error> {
    deserializer.deserialize_any(LooseVisitor)
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(loose(deserializer)?.as_number().unwrap_or(0.0))
}

fn quote<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(loose(deserializer)?.as_number())
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(loose(deserializer)?
        .as_number()
        .filter(|value| *value >= 0.0 && *value <= u32::MAX as f64)
        .map(|value| value.round() as u32))
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(loose(deserializer)?.into_text().unwrap_or_default())
}

fn opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(loose(deserializer)?.into_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_legacy_column_names() {
        let lead = parse_lead(json!({
            "lead_nome": "Giulia",
            "lead_cognome": "Bianchi",
            "lead_email": "giulia@example.com",
            "lead_telefono": 3331234567_u64,
            "indirizzo_completo": "Corso Francia 10, Torino",
            "tipo_immobile": "Appartamento",
            "superficie_mq": "85",
            "numero_locali": "3",
            "avm_agent_pricing_min": 300000,
            "avm_agent_pricing_max": "320000",
            "avm_immobiliare_insights_max": 310000.0
        }))
        .unwrap();

        assert_eq!(lead.lead.first_name, "Giulia");
        assert_eq!(lead.lead.phone.as_deref(), Some("3331234567"));
        assert_eq!(lead.attributes.address, "Corso Francia 10, Torino");
        assert_eq!(lead.attributes.surface_sqm, 85.0);
        assert_eq!(lead.attributes.rooms, Some(3));
        assert_eq!(lead.avm.agent_min, Some(300_000.0));
        assert_eq!(lead.avm.agent_max, Some(320_000.0));
        assert_eq!(lead.avm.insights_min, None);
        assert_eq!(lead.avm.insights_max, Some(310_000.0));
        assert!(lead.raw_payload.is_some());
    }

    #[test]
    fn malformed_numbers_become_zero() {
        let lead = parse_lead(json!({
            "first_name": "Marco",
            "surface_sqm": "about ninety",
            "avm_agent_min": "n/a",
            "avm_agent_max": null,
            "avm_insights_min": {"value": 1},
            "avm_insights_max": "250000,50",
            "rooms": -2
        }))
        .unwrap();

        assert_eq!(lead.attributes.surface_sqm, 0.0);
        assert_eq!(lead.attributes.rooms, None);
        assert_eq!(lead.avm.agent_min, None);
        assert_eq!(lead.avm.agent_max, None);
        assert_eq!(lead.avm.insights_min, None);
        assert_eq!(lead.avm.insights_max, Some(250_000.5));
    }

    #[test]
    fn missing_fields_default() {
        let lead = parse_lead(json!({})).unwrap();
        assert_eq!(lead.attributes.surface_sqm, 0.0);
        assert_eq!(lead.lead.email, "");
        assert_eq!(lead.avm, AvmQuotes::default());
    }

    #[test]
    fn repeated_spellings_are_merged() {
        let lead = parse_lead(json!({
            "email": "a@b.c",
            "lead_email": "other@b.c",
            "surface_sqm": "",
            "superficie_mq": "72",
            "first_name": null,
            "lead_first_name": "Olga",
            "lead_nome": "Olga Maria",
            "avm_agent_min": 280000,
            "avm_agent_pricing_min": "n/a"
        }))
        .unwrap();

        assert_eq!(lead.lead.email, "a@b.c");
        assert_eq!(lead.attributes.surface_sqm, 72.0);
        assert_eq!(lead.lead.first_name, "Olga");
        assert_eq!(lead.avm.agent_min, Some(280_000.0));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(parse_lead(json!([1, 2, 3])).is_err());
        assert!(parse_lead(json!("lead")).is_err());
    }
}
