//! Translation from `sqlparser` statements to the typed AST.
//!
//! Only the SELECT subset the compiler works with is accepted; anything
//! else fails with [`Error::NotImplemented`] naming the construct.

use sqlparser::ast;

use super::dialect::Dialect;
use super::expr::{BinaryOperator, Column, Expr, Literal, Name, Namespace, Table, UnaryOperator};
use super::parse::parse_single_query;
use super::query::{Cte, FromClause, Join, JoinKind, OrderBy, Query, Relation, Select, TableExpr};
use crate::error::{Error, Result};

/// Parse SQL text holding a single SELECT and translate it.
pub fn parse_query(sql: &str, dialect: Option<Dialect>) -> Result<Query> {
    translate_query(&parse_single_query(sql, dialect)?)
}

pub fn translate_query(query: &ast::Query) -> Result<Query> {
    let mut ctes = vec![];
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            ctes.push(Cte {
                name: translate_ident(&cte.alias.name),
                query: Box::new(translate_query(&cte.query)?),
            });
        }
    }

    let mut select = match query.body.as_ref() {
        ast::SetExpr::Select(select) => translate_select(select)?,
        ast::SetExpr::Query(inner) => return translate_query(inner),
        other => return Err(Error::not_implemented(other)),
    };

    if let Some(order_by) = &query.order_by {
        select.order_by = order_by
            .exprs
            .iter()
            .map(|o| {
                Ok(OrderBy {
                    expr: translate_expr(&o.expr)?,
                    asc: o.asc,
                    nulls_first: o.nulls_first,
                })
            })
            .collect::<Result<_>>()?;
    }
    select.limit = query.limit.as_ref().map(translate_count).transpose()?;
    select.offset = query
        .offset
        .as_ref()
        .map(|o| translate_count(&o.value))
        .transpose()?;

    Ok(Query { ctes, select })
}

fn translate_count(expr: &ast::Expr) -> Result<u64> {
    match expr {
        ast::Expr::Value(ast::Value::Number(n, _)) => n
            .parse()
            .map_err(|_| Error::InvalidSql(format!("invalid row count: {}", n))),
        other => Err(Error::not_implemented(other)),
    }
}

fn translate_select(select: &ast::Select) -> Result<Select> {
    let distinct = match &select.distinct {
        None => false,
        Some(ast::Distinct::Distinct) => true,
        Some(other) => return Err(Error::not_implemented(other)),
    };

    let projection = select
        .projection
        .iter()
        .map(translate_select_item)
        .collect::<Result<Vec<_>>>()?;

    let from = if select.from.is_empty() {
        None
    } else {
        let relations = select
            .from
            .iter()
            .map(translate_table_with_joins)
            .collect::<Result<Vec<_>>>()?;
        Some(FromClause::new(relations))
    };

    let group_by = match &select.group_by {
        ast::GroupByExpr::Expressions(exprs, modifiers) if modifiers.is_empty() => exprs
            .iter()
            .map(translate_expr)
            .collect::<Result<Vec<_>>>()?,
        other => return Err(Error::not_implemented(other)),
    };

    Ok(Select {
        distinct,
        projection,
        from,
        where_clause: select.selection.as_ref().map(translate_expr).transpose()?,
        group_by,
        having: select.having.as_ref().map(translate_expr).transpose()?,
        order_by: vec![],
        limit: None,
        offset: None,
    })
}

fn translate_select_item(item: &ast::SelectItem) -> Result<Expr> {
    match item {
        ast::SelectItem::UnnamedExpr(expr) => translate_expr(expr),
        ast::SelectItem::ExprWithAlias { expr, alias } => Ok(Expr::Alias {
            alias: translate_ident(alias),
            child: Box::new(translate_expr(expr)?),
        }),
        ast::SelectItem::Wildcard(_) => Ok(Expr::Wildcard(None)),
        ast::SelectItem::QualifiedWildcard(name, _) => {
            Ok(Expr::Wildcard(Some(translate_namespace(&name.0))))
        }
    }
}

fn translate_table_with_joins(twj: &ast::TableWithJoins) -> Result<Relation> {
    let mut relation = Relation::new(translate_table_factor(&twj.relation)?);
    for join in &twj.joins {
        let (kind, constraint) = match &join.join_operator {
            ast::JoinOperator::Inner(c) => (JoinKind::Inner, Some(c)),
            ast::JoinOperator::LeftOuter(c) => (JoinKind::Left, Some(c)),
            ast::JoinOperator::RightOuter(c) => (JoinKind::Right, Some(c)),
            ast::JoinOperator::FullOuter(c) => (JoinKind::Full, Some(c)),
            ast::JoinOperator::CrossJoin => (JoinKind::Cross, None),
            other => return Err(Error::not_implemented(other)),
        };
        let on = match constraint {
            Some(ast::JoinConstraint::On(expr)) => Some(translate_expr(expr)?),
            Some(ast::JoinConstraint::None) | None => None,
            Some(other) => return Err(Error::not_implemented(other)),
        };
        relation.joins.push(Join::new(
            kind,
            translate_table_factor(&join.relation)?,
            on,
        ));
    }
    Ok(relation)
}

fn translate_table_factor(factor: &ast::TableFactor) -> Result<TableExpr> {
    match factor {
        ast::TableFactor::Table { name, alias, .. } => {
            let mut table = translate_table_name(name)?;
            table.alias = alias.as_ref().map(|a| translate_ident(&a.name));
            Ok(TableExpr::Table(table))
        }
        ast::TableFactor::Derived {
            subquery, alias, ..
        } => Ok(TableExpr::Subquery {
            query: Box::new(translate_query(subquery)?),
            alias: alias.as_ref().map(|a| translate_ident(&a.name)),
        }),
        other => Err(Error::not_implemented(other)),
    }
}

/// `a.b.c` as a table named `c` in namespace `a.b`.
pub fn translate_table_name(name: &ast::ObjectName) -> Result<Table> {
    let (last, rest) = name
        .0
        .split_last()
        .ok_or_else(|| Error::InvalidSql("empty table name".into()))?;
    Ok(Table::new(translate_ident(last)).with_namespace(translate_namespace(rest)))
}

fn translate_ident(ident: &ast::Ident) -> Name {
    Name {
        value: ident.value.clone(),
        quote_style: ident.quote_style,
    }
}

fn translate_namespace(parts: &[ast::Ident]) -> Namespace {
    Namespace::new(parts.iter().map(translate_ident).collect())
}

pub fn translate_expr(expr: &ast::Expr) -> Result<Expr> {
    match expr {
        ast::Expr::Identifier(ident) => Ok(Expr::Column(Column::new(translate_ident(ident)))),

        ast::Expr::CompoundIdentifier(parts) => {
            let (last, rest) = parts
                .split_last()
                .ok_or_else(|| Error::InvalidSql("empty identifier".into()))?;
            let mut column = Column::new(translate_ident(last));
            column.add_namespace(translate_namespace(rest));
            Ok(Expr::Column(column))
        }

        ast::Expr::Value(value) => translate_value(value).map(Expr::Literal),

        ast::Expr::BinaryOp { left, op, right } => Ok(Expr::BinaryOp {
            left: Box::new(translate_expr(left)?),
            op: translate_binary_op(op)?,
            right: Box::new(translate_expr(right)?),
        }),

        ast::Expr::Like {
            negated,
            expr,
            pattern,
            escape_char: None,
            ..
        } => Ok(Expr::BinaryOp {
            left: Box::new(translate_expr(expr)?),
            op: if *negated {
                BinaryOperator::NotLike
            } else {
                BinaryOperator::Like
            },
            right: Box::new(translate_expr(pattern)?),
        }),

        ast::Expr::UnaryOp { op, expr } => {
            let op = match op {
                ast::UnaryOperator::Not => UnaryOperator::Not,
                ast::UnaryOperator::Minus => UnaryOperator::Minus,
                ast::UnaryOperator::Plus => UnaryOperator::Plus,
                other => return Err(Error::not_implemented(other)),
            };
            Ok(Expr::UnaryOp {
                op,
                expr: Box::new(translate_expr(expr)?),
            })
        }

        ast::Expr::Function(function) => translate_function(function),

        ast::Expr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => Ok(Expr::Case {
            operand: operand
                .as_ref()
                .map(|e| translate_expr(e).map(Box::new))
                .transpose()?,
            conditions: conditions
                .iter()
                .map(translate_expr)
                .collect::<Result<_>>()?,
            results: results.iter().map(translate_expr).collect::<Result<_>>()?,
            else_result: else_result
                .as_ref()
                .map(|e| translate_expr(e).map(Box::new))
                .transpose()?,
        }),

        ast::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => Ok(Expr::Between {
            expr: Box::new(translate_expr(expr)?),
            low: Box::new(translate_expr(low)?),
            high: Box::new(translate_expr(high)?),
            negated: *negated,
        }),

        ast::Expr::IsNull(inner) => Ok(Expr::IsNull {
            expr: Box::new(translate_expr(inner)?),
            negated: false,
        }),

        ast::Expr::IsNotNull(inner) => Ok(Expr::IsNull {
            expr: Box::new(translate_expr(inner)?),
            negated: true,
        }),

        ast::Expr::InList {
            expr,
            list,
            negated,
        } => Ok(Expr::InList {
            expr: Box::new(translate_expr(expr)?),
            list: list.iter().map(translate_expr).collect::<Result<_>>()?,
            negated: *negated,
        }),

        ast::Expr::Nested(inner) => Ok(Expr::Nested(Box::new(translate_expr(inner)?))),

        ast::Expr::Subquery(query) => Ok(Expr::Subquery(Box::new(translate_query(query)?))),

        other => Err(Error::not_implemented(other)),
    }
}

fn translate_value(value: &ast::Value) -> Result<Literal> {
    match value {
        ast::Value::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Literal::Int(i))
            } else {
                n.parse::<f64>()
                    .map(Literal::Float)
                    .map_err(|_| Error::InvalidSql(format!("invalid number: {}", n)))
            }
        }
        ast::Value::SingleQuotedString(s) => Ok(Literal::String(s.clone())),
        ast::Value::Boolean(b) => Ok(Literal::Bool(*b)),
        ast::Value::Null => Ok(Literal::Null),
        other => Err(Error::not_implemented(other)),
    }
}

fn translate_binary_op(op: &ast::BinaryOperator) -> Result<BinaryOperator> {
    Ok(match op {
        ast::BinaryOperator::Eq => BinaryOperator::Eq,
        ast::BinaryOperator::NotEq => BinaryOperator::Ne,
        ast::BinaryOperator::Lt => BinaryOperator::Lt,
        ast::BinaryOperator::Gt => BinaryOperator::Gt,
        ast::BinaryOperator::LtEq => BinaryOperator::Lte,
        ast::BinaryOperator::GtEq => BinaryOperator::Gte,
        ast::BinaryOperator::And => BinaryOperator::And,
        ast::BinaryOperator::Or => BinaryOperator::Or,
        ast::BinaryOperator::Plus => BinaryOperator::Plus,
        ast::BinaryOperator::Minus => BinaryOperator::Minus,
        ast::BinaryOperator::Multiply => BinaryOperator::Mul,
        ast::BinaryOperator::Divide => BinaryOperator::Div,
        ast::BinaryOperator::Modulo => BinaryOperator::Mod,
        ast::BinaryOperator::StringConcat => BinaryOperator::Concat,
        other => return Err(Error::not_implemented(other)),
    })
}

fn translate_function(function: &ast::Function) -> Result<Expr> {
    let (name, namespace) = match function.name.0.split_last() {
        Some((last, rest)) => (translate_ident(last), translate_namespace(rest)),
        None => return Err(Error::InvalidSql("empty function name".into())),
    };

    if function.over.is_some() || function.filter.is_some() {
        return Err(Error::not_implemented(function));
    }

    let (args, distinct) = match &function.args {
        ast::FunctionArguments::None => (vec![], false),
        ast::FunctionArguments::List(list) => {
            let distinct = matches!(
                list.duplicate_treatment,
                Some(ast::DuplicateTreatment::Distinct)
            );
            let args = list
                .args
                .iter()
                .map(translate_function_arg)
                .collect::<Result<Vec<_>>>()?;
            (args, distinct)
        }
        other => return Err(Error::not_implemented(other)),
    };

    Ok(Expr::Function {
        name,
        namespace: if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        },
        args,
        distinct,
    })
}

fn translate_function_arg(arg: &ast::FunctionArg) -> Result<Expr> {
    match arg {
        ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(expr)) => translate_expr(expr),
        ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Wildcard) => Ok(Expr::Wildcard(None)),
        ast::FunctionArg::Unnamed(ast::FunctionArgExpr::QualifiedWildcard(name)) => {
            Ok(Expr::Wildcard(Some(translate_namespace(&name.0))))
        }
        other => Err(Error::not_implemented(other)),
    }
}
