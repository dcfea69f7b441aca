use std::collections::BTreeMap;

use super::schema;
use crate::coerce;
use crate::error::{CoerceError, ConfigError, GenerateError};
use crate::ir::{ConfigEntry, ConfigScalar, ConfigValue, DataType};
use crate::value::RawValue;

const DEFAULT_DELIMITER: &str = ",";

type Coerce<T> = fn(&RawValue) -> Result<T, CoerceError>;

struct TypedValues {
    default: Option<ConfigValue>,
    options: Vec<ConfigScalar>,
}

/// Coerces the default and option values of one entry to a single kind.
fn typed_values<T>(desc: &schema::ConfigValue, coerce: Coerce<T>) -> Result<TypedValues, ConfigError>
where
    T: Into<ConfigScalar>,
{
    let scalar = |v: &RawValue| -> Result<ConfigScalar, CoerceError> { coerce(v).map(Into::into) };

    let default = match (&desc.value, desc.is_list) {
        (RawValue::Absent, _) => None,
        (RawValue::List(items), true) => Some(ConfigValue::List(
            items.iter().map(scalar).collect::<Result<_, _>>()?,
        )),
        (other, true) => return Err(ConfigError::NotAList { found: other.kind() }),
        (value, false) => Some(ConfigValue::Scalar(scalar(value)?)),
    };
    let options: Vec<ConfigScalar> = desc.options.iter().map(scalar).collect::<Result<_, _>>()?;

    Ok(TypedValues { default, options })
}

fn type_options(
    opts: &BTreeMap<String, RawValue>,
) -> Result<BTreeMap<String, ConfigScalar>, ConfigError> {
    opts.iter()
        .map(|(key, value)| {
            coerce::infer_scalar(value)
                .map(|v| (key.clone(), v))
                .map_err(|source| ConfigError::TypeOption {
                    key: key.clone(),
                    source,
                })
        })
        .collect()
}

pub(crate) fn gen_config(desc: &schema::ConfigValue) -> Result<ConfigEntry, ConfigError> {
    let data_type = match &desc.data_type {
        Some(name) => name.parse()?,
        None => DataType::String,
    };

    let values = match data_type {
        DataType::String => typed_values(desc, coerce::string_lenient)?,
        DataType::Bool => typed_values(desc, coerce::boolean)?,
        DataType::Int64 => typed_values(desc, coerce::int64)?,
        DataType::Float64 => typed_values(desc, coerce::float64)?,
    };

    let (ui_type, type_opt) = match &desc.user_input {
        Some(ui) => (ui.input_type.clone(), type_options(&ui.type_options)?),
        None => (String::new(), BTreeMap::new()),
    };

    let delimiter = desc.is_list.then(|| {
        desc.delimiter
            .clone()
            .unwrap_or_else(|| DEFAULT_DELIMITER.to_string())
    });

    Ok(ConfigEntry {
        data_type,
        is_slice: desc.is_list,
        default: values.default,
        options: values.options,
        opt_ext: desc.options_ext,
        ui_type,
        type_opt,
        delimiter,
        required: !desc.optional,
    })
}

/// Compiles every config entry, failing on the first invalid one.
pub(crate) fn gen_configs(
    configs: &BTreeMap<String, schema::ConfigValue>,
) -> Result<BTreeMap<String, ConfigEntry>, GenerateError> {
    configs
        .iter()
        .map(|(name, desc)| {
            gen_config(desc)
                .map(|entry| (name.clone(), entry))
                .map_err(|source| GenerateError::Config {
                    config: name.clone(),
                    source,
                })
        })
        .collect()
}
