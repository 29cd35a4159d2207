//! Pagination: offset and row count.
//!
//! A page spread over several data nodes can't be read with the original
//! offset: each node is asked for everything up to the end of the page and
//! results are paged again after merging.

use thiserror::Error;

use crate::sharding::Value;
use crate::statement::{expr, Expr, Pagination, PaginationStyle, PaginationValue, SelectContext};

/// Row count meaning "no limit".
pub const MAX_ROW_COUNT: i64 = i64::MAX;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("pagination value can't be resolved: {0}")]
    Unresolvable(#[from] expr::Error),

    #[error("pagination value \"{0}\" is not an integer")]
    NotAnInteger(String),
}

#[derive(Debug, Clone, Default)]
pub struct PaginationContext {
    offset: Option<PaginationValue>,
    row_count: Option<PaginationValue>,
    style: PaginationStyle,
    resolved_offset: Option<Result<i64, Error>>,
    resolved_row_count: Option<Result<i64, Error>>,
}

impl PaginationContext {
    /// Resolve pagination values against bound parameters.
    pub fn new(pagination: Option<&Pagination>, params: &[Value]) -> Self {
        let Some(pagination) = pagination else {
            return Self::default();
        };

        let resolve = |value: &PaginationValue| -> Result<i64, Error> {
            let resolved = value.value.evaluate(params)?;
            resolved
                .int()
                .ok_or_else(|| Error::NotAnInteger(resolved.to_string()))
        };

        Self {
            resolved_offset: pagination.offset.as_ref().map(&resolve),
            resolved_row_count: pagination.row_count.as_ref().map(&resolve),
            offset: pagination.offset.clone(),
            row_count: pagination.row_count.clone(),
            style: pagination.style,
        }
    }

    pub fn has_pagination(&self) -> bool {
        self.offset.is_some() || self.row_count.is_some()
    }

    pub fn style(&self) -> PaginationStyle {
        self.style
    }

    pub fn offset(&self) -> Option<&PaginationValue> {
        self.offset.as_ref()
    }

    pub fn row_count(&self) -> Option<&PaginationValue> {
        self.row_count.as_ref()
    }

    /// Rows to skip. Zero without an offset.
    pub fn actual_offset(&self) -> Result<i64, Error> {
        match (&self.offset, &self.resolved_offset) {
            (Some(segment), Some(resolved)) => {
                let offset = resolved.clone()?;
                if segment.bound_opened {
                    Ok(offset.saturating_sub(1).max(0))
                } else {
                    Ok(offset)
                }
            }
            _ => Ok(0),
        }
    }

    /// Rows to return. [`MAX_ROW_COUNT`] without a row count.
    pub fn actual_row_count(&self) -> Result<i64, Error> {
        match (&self.row_count, &self.resolved_row_count) {
            (Some(segment), Some(resolved)) => {
                let row_count = resolved.clone()?;
                if segment.bound_opened {
                    Ok(row_count.saturating_add(1))
                } else {
                    Ok(row_count)
                }
            }
            _ => Ok(MAX_ROW_COUNT),
        }
    }

    /// Offset sent to each data node.
    pub fn revised_offset(&self) -> i64 {
        0
    }

    /// Row count sent to each data node.
    ///
    /// Grouped or aggregated rows that can't be merged in ORDER BY
    /// order need everything, so the limit is lifted entirely.
    pub fn revised_row_count(&self, select: &SelectContext) -> Result<i64, Error> {
        let needs_all = (!select.group_by_items().is_empty() || select.has_aggregates())
            && !select.is_same_group_by_and_order_by();
        if needs_all {
            return Ok(MAX_ROW_COUNT);
        }

        let row_count = self.actual_row_count()?;
        match self.style {
            PaginationStyle::Limit => Ok(self.actual_offset()?.saturating_add(row_count)),
            // ROWNUM upper bounds and TOP already count from the first row.
            PaginationStyle::RowNumber | PaginationStyle::Top => Ok(row_count),
        }
    }

    /// Value is a bare parameter marker, revised through bound parameters.
    pub fn parameter_index(value: &PaginationValue) -> Option<usize> {
        match value.value {
            Expr::Parameter(marker) => Some(marker.index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::statement::{ColumnRef, GroupBy, OrderBy, Projection, AggregateFunction};

    fn limit(offset: Option<Expr>, row_count: Option<Expr>) -> Pagination {
        Pagination {
            offset: offset.map(|e| PaginationValue::new(0, 0, e)),
            row_count: row_count.map(|e| PaginationValue::new(0, 0, e)),
            style: PaginationStyle::Limit,
        }
    }

    #[test]
    fn test_limit() {
        let pagination = limit(Some(Expr::literal(10)), Some(Expr::param(0)));
        let context = PaginationContext::new(Some(&pagination), &[Value::from(5)]);

        assert_eq!(context.actual_offset().unwrap(), 10);
        assert_eq!(context.actual_row_count().unwrap(), 5);
        assert_eq!(context.revised_offset(), 0);
        assert_eq!(
            context
                .revised_row_count(&SelectContext::default())
                .unwrap(),
            15
        );
    }

    #[test]
    fn test_defaults() {
        let context = PaginationContext::new(None, &[]);
        assert!(!context.has_pagination());
        assert_eq!(context.actual_offset().unwrap(), 0);
        assert_eq!(context.actual_row_count().unwrap(), MAX_ROW_COUNT);

        let pagination = limit(Some(Expr::literal(3)), None);
        let context = PaginationContext::new(Some(&pagination), &[]);
        assert_eq!(
            context
                .revised_row_count(&SelectContext::default())
                .unwrap(),
            MAX_ROW_COUNT
        );
    }

    #[test]
    fn test_row_number_bounds() {
        let pagination = Pagination {
            offset: Some(PaginationValue::new(0, 0, Expr::literal(10)).opened()),
            row_count: Some(PaginationValue::new(0, 0, Expr::literal(20)).opened()),
            style: PaginationStyle::RowNumber,
        };
        let context = PaginationContext::new(Some(&pagination), &[]);
        assert_eq!(context.actual_offset().unwrap(), 9);
        assert_eq!(context.actual_row_count().unwrap(), 21);
        assert_eq!(
            context
                .revised_row_count(&SelectContext::default())
                .unwrap(),
            21
        );

        let pagination = Pagination {
            offset: None,
            row_count: Some(PaginationValue::new(0, 0, Expr::literal(MAX_ROW_COUNT)).opened()),
            style: PaginationStyle::RowNumber,
        };
        let context = PaginationContext::new(Some(&pagination), &[]);
        assert_eq!(context.actual_row_count().unwrap(), MAX_ROW_COUNT);
    }

    #[test]
    fn test_unresolvable() {
        let pagination = limit(
            None,
            Some(Expr::binary(
                crate::statement::expr::BinaryOperator::Divide,
                Expr::literal(10),
                Expr::literal(0),
            )),
        );
        let context = PaginationContext::new(Some(&pagination), &[]);
        assert_eq!(
            context.actual_row_count(),
            Err(Error::Unresolvable(expr::Error::DivisionByZero))
        );
    }

    #[test]
    fn test_group_by_lifts_limit() {
        let pagination = limit(Some(Expr::literal(2)), Some(Expr::literal(3)));
        let context = PaginationContext::new(Some(&pagination), &[]);

        let mut select = SelectContext {
            group_by: Some(GroupBy {
                items: vec![OrderBy::AscColumn(ColumnRef::new("user_id"))],
                stop: 0,
            }),
            order_by: vec![OrderBy::DescColumn(ColumnRef::new("user_id"))],
            ..Default::default()
        };
        assert_eq!(context.revised_row_count(&select).unwrap(), MAX_ROW_COUNT);

        select.order_by = vec![OrderBy::AscColumn(ColumnRef::new("user_id"))];
        assert_eq!(context.revised_row_count(&select).unwrap(), 5);

        let select = SelectContext {
            projections: vec![Projection {
                aggregate: Some(AggregateFunction::Count),
                ..Projection::column("*")
            }],
            ..Default::default()
        };
        assert_eq!(context.revised_row_count(&select).unwrap(), MAX_ROW_COUNT);
    }
}
