//! Normalization passes applied to parsed trees.
//!
//! 1. `fold_priority` re-associates left-to-right operator chains so that
//!    `AND`/`EXCEPT` bind tighter than `OR`, then drops group markers and
//!    flattens associative nodes.
//! 2. `distribute_or` pushes `IN` restrictions into disjunctions and
//!    flattens nested `OR`s so thesaurus expansion sees a flat term set.

use crate::core::query::ast::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainOp {
    And,
    Or,
    Except,
}

pub fn fold_priority(expr: Expr) -> Expr {
    let mut operands = Vec::new();
    let mut ops = Vec::new();
    collect_chain(expr, &mut operands, &mut ops);

    let operands: Vec<Expr> = operands.into_iter().map(fold_operand).collect();
    let mut operands = operands.into_iter();
    let Some(first) = operands.next() else {
        return Expr::All;
    };

    // Split on OR, reduce AND/EXCEPT left to right inside each segment.
    let mut segments: Vec<Expr> = Vec::new();
    let mut current = first;
    for (op, operand) in ops.into_iter().zip(operands) {
        match op {
            ChainOp::Or => {
                segments.push(current);
                current = operand;
            }
            ChainOp::And => current = and_of(current, operand),
            ChainOp::Except => current = Expr::Except(Box::new(current), Box::new(operand)),
        }
    }
    segments.push(current);

    if segments.len() == 1 {
        segments.pop().unwrap_or(Expr::All)
    } else {
        flatten_or(segments)
    }
}

/// Walk the left spine of a reading-order chain
fn collect_chain(expr: Expr, operands: &mut Vec<Expr>, ops: &mut Vec<ChainOp>) {
    match expr {
        Expr::And(mut children) if children.len() == 2 => {
            let rhs = children.pop();
            let lhs = children.pop();
            if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
                collect_chain(lhs, operands, ops);
                ops.push(ChainOp::And);
                operands.push(rhs);
            }
        }
        Expr::Or(mut children) if children.len() == 2 => {
            let rhs = children.pop();
            let lhs = children.pop();
            if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
                collect_chain(lhs, operands, ops);
                ops.push(ChainOp::Or);
                operands.push(rhs);
            }
        }
        Expr::Except(lhs, rhs) => {
            collect_chain(*lhs, operands, ops);
            ops.push(ChainOp::Except);
            operands.push(*rhs);
        }
        other => operands.push(other),
    }
}

/// Fold an operand that is not part of the current chain
fn fold_operand(expr: Expr) -> Expr {
    match expr {
        Expr::Group(inner) => fold_priority(*inner),
        Expr::In { expr, fields } => Expr::In {
            expr: Box::new(fold_priority(*expr)),
            fields,
        },
        Expr::And(children) => and_all(children.into_iter().map(fold_priority).collect()),
        Expr::Or(children) => flatten_or(children.into_iter().map(fold_priority).collect()),
        other => other,
    }
}

fn and_of(lhs: Expr, rhs: Expr) -> Expr {
    and_all(vec![lhs, rhs])
}

fn and_all(children: Vec<Expr>) -> Expr {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Expr::And(nested) => flat.extend(nested),
            other => flat.push(other),
        }
    }
    if flat.len() == 1 {
        flat.pop().unwrap_or(Expr::All)
    } else {
        Expr::And(flat)
    }
}

fn flatten_or(children: Vec<Expr>) -> Expr {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Expr::Or(nested) => flat.extend(nested),
            other => flat.push(other),
        }
    }
    if flat.len() == 1 {
        flat.pop().unwrap_or(Expr::All)
    } else {
        Expr::Or(flat)
    }
}

pub fn distribute_or(expr: Expr) -> Expr {
    match expr {
        Expr::In { expr, fields } => match distribute_or(*expr) {
            Expr::Or(children) => flatten_or(
                children
                    .into_iter()
                    .map(|child| {
                        distribute_or(Expr::In {
                            expr: Box::new(child),
                            fields: fields.clone(),
                        })
                    })
                    .collect(),
            ),
            inner => Expr::In {
                expr: Box::new(inner),
                fields,
            },
        },
        Expr::Or(children) => flatten_or(children.into_iter().map(distribute_or).collect()),
        Expr::And(children) => and_all(children.into_iter().map(distribute_or).collect()),
        Expr::Except(lhs, rhs) => Expr::Except(
            Box::new(distribute_or(*lhs)),
            Box::new(distribute_or(*rhs)),
        ),
        Expr::Group(inner) => distribute_or(*inner),
        other => other,
    }
}

/// Both passes, in order
pub fn normalize(expr: Expr) -> Expr {
    distribute_or(fold_priority(expr))
}
