use crate::database::schema::{CollectionSchema, FieldKind, FieldSpec};

use super::error::FilterError;
use super::types::{Condition, FilterExpr, FilterOp, FilterValue};

/// Builds a `FilterExpr` from the non-control query pairs of a list request
pub struct FilterWhere {
    schema: &'static CollectionSchema,
    conditions: Vec<Condition>,
    // Plain `field=value` pairs; a field seen more than once becomes `in`
    equalities: Vec<(&'static FieldSpec, Vec<String>)>,
}

impl FilterWhere {
    pub fn new(schema: &'static CollectionSchema) -> Self {
        Self {
            schema,
            conditions: vec![],
            equalities: vec![],
        }
    }

    pub fn parse<'a>(
        schema: &'static CollectionSchema,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<FilterExpr, FilterError> {
        let mut filter_where = Self::new(schema);
        for (key, value) in pairs {
            filter_where.push(key, value)?;
        }
        Ok(filter_where.finish())
    }

    pub fn push(&mut self, key: &str, value: &str) -> Result<(), FilterError> {
        let (name, token) = Self::split_key(key)?;

        let field = self
            .schema
            .field(name)
            .ok_or_else(|| FilterError::UnknownField(name.to_string()))?;
        if !field.filterable {
            return Err(FilterError::NotFilterable(name.to_string()));
        }

        let op = match token {
            None => FilterOp::Eq,
            Some(token) => FilterOp::from_token(token).ok_or_else(|| FilterError::UnsupportedOperator {
                field: name.to_string(),
                operator: token.to_string(),
            })?,
        };

        match op {
            FilterOp::Eq => {
                Self::check_literal(field, value)?;
                let value = Self::stored(field, value);
                match self.equalities.iter_mut().find(|(f, _)| f.name == field.name) {
                    Some((_, values)) => values.push(value),
                    None => self.equalities.push((field, vec![value])),
                }
            }
            FilterOp::In => {
                let values = Self::split_list(field, value)?;
                let existing = self
                    .conditions
                    .iter()
                    .position(|c| c.op == FilterOp::In && c.field.name == field.name);
                match existing.map(|i| &mut self.conditions[i].value) {
                    Some(FilterValue::List(list)) => list.extend(values),
                    _ => self.conditions.push(Condition { field, op, value: FilterValue::List(values) }),
                }
            }
            _ => {
                if !field.kind.is_ordered() {
                    return Err(FilterError::UnsupportedOperator {
                        field: name.to_string(),
                        operator: token.unwrap_or_default().to_string(),
                    });
                }
                Self::check_literal(field, value)?;
                self.conditions.push(Condition {
                    field,
                    op,
                    value: FilterValue::Single(value.trim().to_string()),
                });
            }
        }
        Ok(())
    }

    pub fn finish(self) -> FilterExpr {
        let mut expr = FilterExpr::new();
        for (field, mut values) in self.equalities {
            if values.len() == 1 {
                expr = expr.and(Condition::eq(field, values.remove(0)));
            } else {
                values.dedup();
                expr = expr.and(Condition { field, op: FilterOp::In, value: FilterValue::List(values) });
            }
        }
        expr.conditions.extend(self.conditions);
        expr
    }

    /// `field` or `field[op]`; anything else is malformed
    fn split_key(key: &str) -> Result<(&str, Option<&str>), FilterError> {
        match key.find('[') {
            None if key.contains(']') => Err(FilterError::MalformedKey(key.to_string())),
            None => Ok((key, None)),
            Some(open) => {
                let rest = &key[open + 1..];
                let token = rest
                    .strip_suffix(']')
                    .filter(|t| !t.is_empty() && !t.contains('[') && !t.contains(']'))
                    .ok_or_else(|| FilterError::MalformedKey(key.to_string()))?;
                if open == 0 {
                    return Err(FilterError::MalformedKey(key.to_string()));
                }
                Ok((&key[..open], Some(token)))
            }
        }
    }

    /// Text is matched as given; other kinds were validated trimmed and are stored that way
    fn stored(field: &FieldSpec, value: &str) -> String {
        match field.kind {
            FieldKind::Text | FieldKind::TextArray => value.to_string(),
            _ => value.trim().to_string(),
        }
    }

    fn split_list(field: &FieldSpec, value: &str) -> Result<Vec<String>, FilterError> {
        let mut values = vec![];
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            Self::check_literal(field, part)?;
            values.push(part.to_string());
        }
        Ok(values)
    }

    fn check_literal(field: &FieldSpec, value: &str) -> Result<(), FilterError> {
        if field.kind.accepts(value) {
            Ok(())
        } else {
            Err(FilterError::InvalidValue {
                field: field.name.to_string(),
                value: value.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::{BOOTCAMPS, COURSES};

    fn parse(pairs: &[(&str, &str)]) -> Result<FilterExpr, FilterError> {
        FilterWhere::parse(&BOOTCAMPS, pairs.iter().copied())
    }

    #[test]
    fn bracketed_operator_becomes_comparison() {
        let expr = parse(&[("averageCost[lte]", "10000")]).unwrap();
        assert_eq!(expr.conditions.len(), 1);
        let c = &expr.conditions[0];
        assert_eq!(c.field.name, "averageCost");
        assert_eq!(c.op, FilterOp::Lte);
        assert_eq!(c.value, FilterValue::Single("10000".into()));
    }

    #[test]
    fn operator_words_in_values_are_left_alone() {
        let expr = parse(&[("name", "gte Academy")]).unwrap();
        assert_eq!(expr.conditions[0].op, FilterOp::Eq);
        assert_eq!(expr.conditions[0].value, FilterValue::Single("gte Academy".into()));
    }

    #[test]
    fn in_splits_on_commas() {
        let expr = parse(&[("careers[in]", "Business, UI/UX")]).unwrap();
        assert_eq!(expr.conditions[0].op, FilterOp::In);
        assert_eq!(
            expr.conditions[0].value,
            FilterValue::List(vec!["Business".into(), "UI/UX".into()])
        );
    }

    #[test]
    fn repeated_plain_key_becomes_in() {
        let expr = parse(&[("location.state", "MA"), ("location.state", "CA")]).unwrap();
        assert_eq!(expr.conditions.len(), 1);
        assert_eq!(expr.conditions[0].op, FilterOp::In);
        assert_eq!(expr.conditions[0].value.values(), vec!["MA", "CA"]);
    }

    #[test]
    fn repeated_in_keys_are_merged() {
        let expr = parse(&[("careers[in]", "Business"), ("careers[in]", "Other")]).unwrap();
        assert_eq!(expr.conditions.len(), 1);
        assert_eq!(expr.conditions[0].value.values(), vec!["Business", "Other"]);
    }

    #[test]
    fn range_on_both_sides() {
        let expr = FilterWhere::parse(&COURSES, [("tuition[gte]", "1000"), ("tuition[lt]", "9000")]).unwrap();
        let ops: Vec<_> = expr.conditions.iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![FilterOp::Gte, FilterOp::Lt]);
    }

    #[test]
    fn rejects_unknown_operator() {
        let err = parse(&[("averageCost[ne]", "1")]).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnsupportedOperator { field: "averageCost".into(), operator: "ne".into() }
        );
    }

    #[test]
    fn rejects_malformed_keys() {
        for key in ["averageCost[gte", "averageCost]", "[gte]", "averageCost[]", "a[b][c]"] {
            assert!(matches!(parse(&[(key, "1")]), Err(FilterError::MalformedKey(_))), "{}", key);
        }
    }

    #[test]
    fn rejects_unknown_and_computed_fields() {
        assert_eq!(parse(&[("nope", "1")]).unwrap_err(), FilterError::UnknownField("nope".into()));
        assert_eq!(
            parse(&[("location", "x")]).unwrap_err(),
            FilterError::NotFilterable("location".into())
        );
    }

    #[test]
    fn rejects_values_of_the_wrong_kind() {
        assert_eq!(
            parse(&[("averageCost[gte]", "cheap")]).unwrap_err(),
            FilterError::InvalidValue { field: "averageCost".into(), value: "cheap".into() }
        );
        assert!(parse(&[("housing", "maybe")]).is_err());
        assert!(parse(&[("user", "5d713995b721c3bb38c1f5d0")]).is_err());
    }

    #[test]
    fn padded_literals_are_stored_trimmed() {
        let id = "6f1c1a6e-8f0e-4f43-9d0c-6a1f4b1d2e3f";
        let padded = format!(" {} ", id);
        let expr = parse(&[("user", padded.as_str()), ("housing", "true ")]).unwrap();
        assert_eq!(expr.conditions[0].value, FilterValue::Single(id.into()));
        assert_eq!(expr.conditions[1].value, FilterValue::Single("true".into()));

        let expr = parse(&[("name", " Devworks ")]).unwrap();
        assert_eq!(expr.conditions[0].value, FilterValue::Single(" Devworks ".into()));
    }

    #[test]
    fn range_needs_ordered_field() {
        assert!(matches!(
            parse(&[("housing[gt]", "true")]),
            Err(FilterError::UnsupportedOperator { .. })
        ));
    }
}
