//! Hindley-Milner type inference with row-polymorphic records and variants.
//!
//! Inference of an expression produces a pair of substitution and type; the
//! substitution is the change to apply to the environment after inferring
//! that sub-expression. Substitutions are threaded in the textual order of
//! sub-expression visitation, and every unification works on types that
//! already carry the running substitution.

use crate::ast::{Expr, ExprKind, Pattern};
use crate::types::{Row, Scheme, Type, VarSupply};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Which side of a unification a row mismatch report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSide {
    Left,
    Right,
}

impl fmt::Display for RowSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RowSide::Left => write!(f, "left"),
            RowSide::Right => write!(f, "right"),
        }
    }
}

/// Type checking errors. All are fatal to the current inference run.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeError {
    UnboundVariable(String),
    /// The occurs check rejected a binding: variable name, offending type
    InfiniteType(String, Type),
    /// Constructor against row, or a row tail resolved to a non-row
    KindMismatch(Type, Type),
    ConstructorMismatch(String, String),
    /// Same constructor applied to a different number of arguments
    ArityMismatch(Type, Type),
    /// Record against variant
    RowKindMismatch(Type, Type),
    /// Width mismatch between closed rows: the named side lacks the keys
    RowMismatch(Vec<String>, RowSide),
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeError::UnboundVariable(name) => {
                write!(f, "unbound variable: {name}")
            }
            TypeError::InfiniteType(var, ty) => {
                write!(f, "infinite type: {var} occurs in {ty}")
            }
            TypeError::KindMismatch(t1, t2) => {
                write!(f, "kind mismatch: cannot unify {t1} with {t2}")
            }
            TypeError::ConstructorMismatch(n1, n2) => {
                write!(f, "cannot unify {n1} with {n2}")
            }
            TypeError::ArityMismatch(t1, t2) => {
                write!(f, "arity mismatch: cannot unify {t1} with {t2}")
            }
            TypeError::RowKindMismatch(t1, t2) => {
                write!(f, "cannot unify record with variant: {t1} vs {t2}")
            }
            TypeError::RowMismatch(keys, side) => {
                write!(f, "{side} row is missing {}", keys.join(", "))
            }
        }
    }
}

impl std::error::Error for TypeError {}

/// A finite map from type-variable names to types, acting as a function on
/// types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    map: HashMap<String, Type>,
}

impl Substitution {
    pub fn new() -> Substitution {
        Substitution {
            map: HashMap::new(),
        }
    }

    pub fn singleton(name: impl Into<String>, ty: Type) -> Substitution {
        let mut map = HashMap::new();
        map.insert(name.into(), ty);
        Substitution { map }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Apply the substitution to a type. Unknown variables pass through.
    ///
    /// On a row the items are rewritten pointwise and the substitution is
    /// then applied to the tail. A tail that resolves to another row of the
    /// same kind is merged flat into the outer row: the outer items win on
    /// key collision, the tail row's own tail takes over, and the result is
    /// open only when both rows were open. A tail resolving to anything
    /// other than a variable or a matching row is a kind error.
    pub fn apply(&self, ty: &Type) -> Result<Type, TypeError> {
        self.apply_inner(ty, &mut HashSet::new())
    }

    fn apply_inner(
        &self,
        ty: &Type,
        visited: &mut HashSet<String>,
    ) -> Result<Type, TypeError> {
        match ty {
            Type::Var(name) => {
                if visited.contains(name) {
                    return Ok(ty.clone());
                }
                match self.map.get(name) {
                    Some(bound) => {
                        visited.insert(name.clone());
                        let out = self.apply_inner(bound, visited);
                        visited.remove(name);
                        out
                    }
                    None => Ok(ty.clone()),
                }
            }
            Type::Cons(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.apply_inner(arg, visited))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Cons(name.clone(), args))
            }
            Type::Rec(row) => {
                let mut items = BTreeMap::new();
                for (key, item) in &row.items {
                    items.insert(key.clone(), self.apply_inner(item, visited)?);
                }
                match self.apply_inner(&Type::Var(row.rest.clone()), visited)? {
                    Type::Var(tail) => Ok(Type::Rec(Row {
                        union: row.union,
                        open: row.open,
                        items,
                        rest: tail,
                    })),
                    Type::Rec(tail) if tail.union == row.union => {
                        // Merge flat instead of nesting; repeated refinements
                        // would otherwise chain rows arbitrarily deep.
                        let mut merged = tail.items;
                        merged.extend(items);
                        Ok(Type::Rec(Row {
                            union: row.union,
                            open: row.open && tail.open,
                            items: merged,
                            rest: tail.rest,
                        }))
                    }
                    other => {
                        Err(TypeError::KindMismatch(Type::Var(row.rest.clone()), other))
                    }
                }
            }
        }
    }

    /// Compose two substitutions: applying the result equals applying
    /// `other` first and then `self`. Bindings of `self` win on collision.
    pub fn compose(&self, other: &Substitution) -> Result<Substitution, TypeError> {
        let mut map = HashMap::new();
        for (name, ty) in &other.map {
            map.insert(name.clone(), self.apply(ty)?);
        }
        for (name, ty) in &self.map {
            map.insert(name.clone(), self.apply(ty)?);
        }
        Ok(Substitution { map })
    }

    /// Apply the substitution to a scheme body, restricted to the variables
    /// the scheme does not quantify over.
    pub fn apply_scheme(&self, scheme: &Scheme) -> Result<Scheme, TypeError> {
        let mut restricted = self.clone();
        for name in &scheme.quantified {
            restricted.map.remove(name);
        }
        Ok(Scheme {
            quantified: scheme.quantified.clone(),
            body: restricted.apply(&scheme.body)?,
        })
    }
}

impl FromIterator<(String, Type)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (String, Type)>>(iter: I) -> Self {
        Substitution {
            map: iter.into_iter().collect(),
        }
    }
}

/// Bind a variable to a type, refusing to create an infinite type.
fn bind_var(name: &str, ty: &Type) -> Result<Substitution, TypeError> {
    if let Type::Var(other) = ty {
        if other == name {
            return Ok(Substitution::new());
        }
    }
    if ty.occurs(name) {
        return Err(TypeError::InfiniteType(name.to_string(), ty.clone()));
    }
    Ok(Substitution::singleton(name, ty.clone()))
}

/// Find the most general substitution making the two types equal.
pub fn unify(t1: &Type, t2: &Type, supply: &mut VarSupply) -> Result<Substitution, TypeError> {
    match (t1, t2) {
        (Type::Var(name), other) | (other, Type::Var(name)) => bind_var(name, other),

        (Type::Cons(n1, args1), Type::Cons(n2, args2)) => {
            if n1 != n2 {
                return Err(TypeError::ConstructorMismatch(n1.clone(), n2.clone()));
            }
            if args1.len() != args2.len() {
                return Err(TypeError::ArityMismatch(t1.clone(), t2.clone()));
            }
            let mut subst = Substitution::new();
            for (a1, a2) in args1.iter().zip(args2) {
                let s = unify(&subst.apply(a1)?, &subst.apply(a2)?, supply)?;
                subst = s.compose(&subst)?;
            }
            Ok(subst)
        }

        (Type::Rec(left), Type::Rec(right)) => unify_rows(left, right, supply),

        _ => Err(TypeError::KindMismatch(t1.clone(), t2.clone())),
    }
}

/// Row unification: unify the common items, then connect both tails through
/// one shared fresh extension variable. Width subtyping becomes equality
/// once each tail absorbs the other side's exclusive items.
fn unify_rows(left: &Row, right: &Row, supply: &mut VarSupply) -> Result<Substitution, TypeError> {
    if left.union != right.union {
        return Err(TypeError::RowKindMismatch(
            Type::Rec(left.clone()),
            Type::Rec(right.clone()),
        ));
    }

    let mut subst = Substitution::new();
    for (key, lt) in &left.items {
        if let Some(rt) = right.items.get(key) {
            let s = unify(&subst.apply(lt)?, &subst.apply(rt)?, supply)?;
            subst = s.compose(&subst)?;
        }
    }

    let only_left: BTreeMap<String, Type> = left
        .items
        .iter()
        .filter(|(key, _)| !right.items.contains_key(*key))
        .map(|(key, ty)| (key.clone(), ty.clone()))
        .collect();
    let only_right: BTreeMap<String, Type> = right
        .items
        .iter()
        .filter(|(key, _)| !left.items.contains_key(*key))
        .map(|(key, ty)| (key.clone(), ty.clone()))
        .collect();

    let open = left.open && right.open;
    let can_extend_left = only_left.is_empty() || right.open;
    let can_extend_right = only_right.is_empty() || left.open;
    if !(open || (can_extend_left && can_extend_right)) {
        return Err(if can_extend_left {
            TypeError::RowMismatch(only_right.keys().cloned().collect(), RowSide::Left)
        } else {
            TypeError::RowMismatch(only_left.keys().cloned().collect(), RowSide::Right)
        });
    }

    if left.rest == right.rest {
        // A shared tail cannot absorb two different extensions.
        if only_left.is_empty() && only_right.is_empty() {
            return Ok(subst);
        }
        let (keys, side) = if only_right.is_empty() {
            (only_left.keys().cloned().collect(), RowSide::Right)
        } else {
            (only_right.keys().cloned().collect(), RowSide::Left)
        };
        return Err(TypeError::RowMismatch(keys, side));
    }

    let tail = supply.fresh_name();

    let absorb_right = Type::Rec(Row {
        union: left.union,
        open,
        items: only_right,
        rest: tail.clone(),
    });
    let s = unify(
        &subst.apply(&Type::Var(left.rest.clone()))?,
        &subst.apply(&absorb_right)?,
        supply,
    )?;
    subst = s.compose(&subst)?;

    let absorb_left = Type::Rec(Row {
        union: left.union,
        open,
        items: only_left,
        rest: tail,
    });
    let s = unify(
        &subst.apply(&Type::Var(right.rest.clone()))?,
        &subst.apply(&absorb_left)?,
        supply,
    )?;
    subst = s.compose(&subst)?;

    Ok(subst)
}

/// Typing environment: a finite map from identifier names to schemes.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    bindings: HashMap<String, Scheme>,
}

impl TypeEnv {
    pub fn new() -> TypeEnv {
        TypeEnv {
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, scheme: Scheme) {
        self.bindings.insert(name.into(), scheme);
    }

    pub fn lookup(&self, name: &str) -> Option<&Scheme> {
        self.bindings.get(name)
    }

    /// A copy of the environment with one extra monomorphic binding.
    pub fn extend(&self, name: impl Into<String>, ty: Type) -> TypeEnv {
        let mut out = self.clone();
        out.bind(name, Scheme::monomorphic(ty));
        out
    }

    /// Apply a substitution to every scheme in the environment.
    pub fn apply(&self, subst: &Substitution) -> Result<TypeEnv, TypeError> {
        let mut bindings = HashMap::new();
        for (name, scheme) in &self.bindings {
            bindings.insert(name.clone(), subst.apply_scheme(scheme)?);
        }
        Ok(TypeEnv { bindings })
    }

    /// Free variables of the environment: the free variables of every
    /// scheme body minus that scheme's quantified names.
    pub fn free_vars(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        for scheme in self.bindings.values() {
            let mut free = scheme.body.free_vars();
            for name in &scheme.quantified {
                free.remove(name);
            }
            out.extend(free);
        }
        out
    }

    /// Generalise a type over the variables not bound by the environment.
    pub fn generalize(&self, ty: &Type) -> Scheme {
        let env_free = self.free_vars();
        let mut quantified: Vec<String> = ty
            .free_vars()
            .into_iter()
            .filter(|name| !env_free.contains(name))
            .collect();
        quantified.sort();
        Scheme {
            quantified,
            body: ty.clone(),
        }
    }
}

/// Instantiate a scheme: replace every quantified name with a fresh
/// variable and return the refreshed body.
pub fn instantiate(scheme: &Scheme, supply: &mut VarSupply) -> Result<Type, TypeError> {
    if scheme.quantified.is_empty() {
        return Ok(scheme.body.clone());
    }
    let subst: Substitution = scheme
        .quantified
        .iter()
        .map(|name| (name.clone(), supply.fresh()))
        .collect();
    subst.apply(&scheme.body)
}

/// Infer the type of an expression in a typing environment.
///
/// Returns the substitution accumulated while inferring the expression and
/// the expression's type under that substitution. The first unification
/// failure aborts the whole run.
pub fn infer(
    expr: &Expr,
    env: &TypeEnv,
    supply: &mut VarSupply,
) -> Result<(Substitution, Type), TypeError> {
    match &expr.kind {
        ExprKind::Num(_) => Ok((Substitution::new(), Type::num())),

        ExprKind::Str(_) => Ok((Substitution::new(), Type::string())),

        ExprKind::Id(name) => {
            let scheme = env
                .lookup(name)
                .ok_or_else(|| TypeError::UnboundVariable(name.clone()))?;
            Ok((Substitution::new(), instantiate(scheme, supply)?))
        }

        ExprKind::Rec(fields) => {
            let mut subst = Substitution::new();
            let mut items = BTreeMap::new();
            for (key, value) in fields {
                let (s, ty) = infer(value, &env.apply(&subst)?, supply)?;
                subst = s.compose(&subst)?;
                items.insert(key.clone(), ty);
            }
            let mut applied = BTreeMap::new();
            for (key, ty) in items {
                applied.insert(key, subst.apply(&ty)?);
            }
            // Record literals are closed; the tail is an unused witness.
            let row = Row::new(false, false, applied, supply.fresh_name());
            Ok((subst, Type::Rec(row)))
        }

        ExprKind::List(elems) => {
            let elem = supply.fresh();
            let mut subst = Substitution::new();
            for item in elems {
                let (s, ty) = infer(item, &env.apply(&subst)?, supply)?;
                subst = s.compose(&subst)?;
                let s = unify(&subst.apply(&elem)?, &subst.apply(&ty)?, supply)?;
                subst = s.compose(&subst)?;
            }
            let elem = subst.apply(&elem)?;
            Ok((subst, Type::list(elem)))
        }

        ExprKind::Cons(name, payload) => {
            let (subst, payload_ty) = match payload {
                Some(inner) => infer(inner, env, supply)?,
                None => (Substitution::new(), Type::unit()),
            };
            let mut items = BTreeMap::new();
            items.insert(name.clone(), payload_ty);
            let row = Row::variant(items, supply.fresh_name());
            Ok((subst, Type::Rec(row)))
        }

        ExprKind::Acc(record, prop) => {
            let (subst, record_ty) = infer(record, env, supply)?;
            let field = supply.fresh();
            let mut items = BTreeMap::new();
            items.insert(prop.clone(), field.clone());
            let wanted = Type::Rec(Row::record(items, supply.fresh_name()));
            let s = unify(&record_ty, &wanted, supply)?;
            let subst = s.compose(&subst)?;
            let field = subst.apply(&field)?;
            Ok((subst, field))
        }

        ExprKind::App(callee, args) => {
            let (mut subst, callee_ty) = infer(callee, env, supply)?;
            let mut arg_tys = Vec::new();
            for arg in args {
                let (s, ty) = infer(arg, &env.apply(&subst)?, supply)?;
                subst = s.compose(&subst)?;
                arg_tys.push(ty);
            }
            let result = supply.fresh();
            let mut func_args = Vec::new();
            for ty in &arg_tys {
                func_args.push(subst.apply(ty)?);
            }
            let wanted = Type::func(func_args, result.clone());
            let s = unify(&subst.apply(&callee_ty)?, &wanted, supply)?;
            subst = s.compose(&subst)?;
            let result = subst.apply(&result)?;
            Ok((subst, result))
        }

        ExprKind::Lam(params, body) => {
            let mut scoped = env.clone();
            let mut param_tys = Vec::new();
            for param in params {
                let ty = supply.fresh();
                scoped = scoped.extend(param.clone(), ty.clone());
                param_tys.push(ty);
            }
            let (subst, body_ty) = infer(body, &scoped, supply)?;
            let mut args = Vec::new();
            for ty in &param_tys {
                args.push(subst.apply(ty)?);
            }
            Ok((subst, Type::func(args, body_ty)))
        }

        ExprKind::Match {
            scrutinee,
            cases,
            otherwise,
        } => infer_match(scrutinee, cases, otherwise.as_deref(), env, supply),
    }
}

fn infer_match(
    scrutinee: &Expr,
    cases: &[(Pattern, Expr)],
    otherwise: Option<&Expr>,
    env: &TypeEnv,
    supply: &mut VarSupply,
) -> Result<(Substitution, Type), TypeError> {
    let (mut subst, scrut_ty) = infer(scrutinee, env, supply)?;

    // Pin the scrutinee to an open empty union so that case unifications
    // accrete tags onto it.
    let empty_union = Type::Rec(Row::variant(BTreeMap::new(), supply.fresh_name()));
    let s = unify(&scrut_ty, &empty_union, supply)?;
    subst = s.compose(&subst)?;

    let pat_ty = supply.fresh();
    let out_ty = supply.fresh();

    for (pattern, body) in cases {
        let mut scoped = env.clone();
        for binder in pattern.binders() {
            let ty = supply.fresh();
            scoped = scoped.extend(binder, ty);
        }

        let (s, this_pat) = infer(&pattern.to_expr(), &scoped.apply(&subst)?, supply)?;
        subst = s.compose(&subst)?;
        let s = unify(&subst.apply(&pat_ty)?, &subst.apply(&this_pat)?, supply)?;
        subst = s.compose(&subst)?;

        let (s, body_ty) = infer(body, &scoped.apply(&subst)?, supply)?;
        subst = s.compose(&subst)?;
        let s = unify(&subst.apply(&out_ty)?, &subst.apply(&body_ty)?, supply)?;
        subst = s.compose(&subst)?;
    }

    let scrut_now = subst.apply(&scrut_ty)?;
    let pat_now = subst.apply(&pat_ty)?;
    match otherwise {
        None => {
            // Without a default the scrutinee must be exactly the union of
            // the pattern tags: flipping the row closed makes exhaustiveness
            // fall out of unification.
            let closed = match pat_now {
                Type::Rec(row) => Type::Rec(row.flipped()),
                other => other,
            };
            let s = unify(&scrut_now, &closed, supply)?;
            subst = s.compose(&subst)?;
        }
        Some(default) => {
            let s = unify(&scrut_now, &pat_now, supply)?;
            subst = s.compose(&subst)?;
            let (s, default_ty) = infer(default, &env.apply(&subst)?, supply)?;
            subst = s.compose(&subst)?;
            let s = unify(&subst.apply(&out_ty)?, &subst.apply(&default_ty)?, supply)?;
            subst = s.compose(&subst)?;
        }
    }

    let out = subst.apply(&out_ty)?;
    Ok((subst, out))
}

/// Infer an expression's type in the given environment with a fresh
/// variable supply, and resolve it through the final substitution.
pub fn typecheck(expr: &Expr, env: &TypeEnv) -> Result<Type, TypeError> {
    let mut supply = VarSupply::new();
    let (subst, ty) = infer(expr, env, &mut supply)?;
    subst.apply(&ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{PatKind, Span};
    use crate::types::FUNC;

    fn num() -> Type {
        Type::num()
    }

    fn record(items: Vec<(&str, Type)>, open: bool, rest: &str) -> Type {
        Type::Rec(Row::new(
            false,
            open,
            items.into_iter().map(|(k, t)| (k.to_string(), t)).collect(),
            rest,
        ))
    }

    fn variant(items: Vec<(&str, Type)>, open: bool, rest: &str) -> Type {
        Type::Rec(Row::new(
            true,
            open,
            items.into_iter().map(|(k, t)| (k.to_string(), t)).collect(),
            rest,
        ))
    }

    fn expr(kind: ExprKind) -> Expr {
        Expr::new(kind, Span::default())
    }

    #[test]
    fn test_unify_equal_cons() {
        let mut supply = VarSupply::new();
        let s = unify(&num(), &num(), &mut supply).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn test_unify_constructor_mismatch() {
        let mut supply = VarSupply::new();
        let err = unify(&num(), &Type::string(), &mut supply).unwrap_err();
        assert_eq!(
            err,
            TypeError::ConstructorMismatch("num".to_string(), "str".to_string())
        );
    }

    #[test]
    fn test_unify_arity_mismatch() {
        let mut supply = VarSupply::new();
        let t1 = Type::func(vec![num()], num());
        let t2 = Type::func(vec![num(), num()], num());
        assert!(matches!(
            unify(&t1, &t2, &mut supply),
            Err(TypeError::ArityMismatch(_, _))
        ));
    }

    #[test]
    fn test_unify_binds_variable() {
        let mut supply = VarSupply::new();
        let s = unify(&Type::var("a"), &num(), &mut supply).unwrap();
        assert_eq!(s.apply(&Type::var("a")).unwrap(), num());
    }

    #[test]
    fn test_unify_same_variable_is_identity() {
        let mut supply = VarSupply::new();
        let s = unify(&Type::var("a"), &Type::var("a"), &mut supply).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn test_occurs_check() {
        let mut supply = VarSupply::new();
        let err = unify(&Type::var("a"), &Type::list(Type::var("a")), &mut supply).unwrap_err();
        assert!(matches!(err, TypeError::InfiniteType(name, _) if name == "a"));
    }

    #[test]
    fn test_unify_record_with_variant_fails() {
        let mut supply = VarSupply::new();
        let rec = record(vec![("a", num())], true, "r1");
        let var = variant(vec![("A", num())], true, "r2");
        assert!(matches!(
            unify(&rec, &var, &mut supply),
            Err(TypeError::RowKindMismatch(_, _))
        ));
    }

    #[test]
    fn test_unify_cons_with_row_is_kind_mismatch() {
        let mut supply = VarSupply::new();
        let rec = record(vec![("a", num())], true, "r1");
        assert!(matches!(
            unify(&num(), &rec, &mut supply),
            Err(TypeError::KindMismatch(_, _))
        ));
    }

    #[test]
    fn test_unify_open_rows_absorb_each_other() {
        let mut supply = VarSupply::new();
        let left = record(vec![("a", num())], true, "r1");
        let right = record(vec![("b", Type::string())], true, "r2");
        let s = unify(&left, &right, &mut supply).unwrap();
        let l = s.apply(&left).unwrap();
        let r = s.apply(&right).unwrap();
        assert_eq!(l, r);
        match l {
            Type::Rec(row) => {
                assert!(row.open);
                assert_eq!(row.items.len(), 2);
                assert_eq!(row.items["a"], num());
                assert_eq!(row.items["b"], Type::string());
            }
            other => panic!("expected a row, got {other}"),
        }
    }

    #[test]
    fn test_unify_closed_rows_same_shape() {
        let mut supply = VarSupply::new();
        let left = record(vec![("a", num())], false, "r1");
        let right = record(vec![("a", num())], false, "r2");
        let s = unify(&left, &right, &mut supply).unwrap();
        assert_eq!(s.apply(&left).unwrap(), s.apply(&right).unwrap());
    }

    #[test]
    fn test_unify_closed_width_mismatch() {
        let mut supply = VarSupply::new();
        let left = record(vec![("a", num())], false, "r1");
        let right = record(
            vec![("a", num()), ("b", Type::string())],
            false,
            "r2",
        );
        let err = unify(&left, &right, &mut supply).unwrap_err();
        assert_eq!(
            err,
            TypeError::RowMismatch(vec!["b".to_string()], RowSide::Left)
        );
    }

    #[test]
    fn test_unify_closed_left_absorbs_into_open_right() {
        let mut supply = VarSupply::new();
        let left = record(vec![("a", num()), ("b", Type::string())], false, "r1");
        let right = record(vec![("a", num())], true, "r2");
        let s = unify(&left, &right, &mut supply).unwrap();
        let l = s.apply(&left).unwrap();
        let r = s.apply(&right).unwrap();
        assert_eq!(l, r);
        match r {
            Type::Rec(row) => {
                assert!(!row.open);
                assert_eq!(row.items.len(), 2);
            }
            other => panic!("expected a row, got {other}"),
        }
    }

    #[test]
    fn test_unify_shared_tail_with_conflicting_items_fails() {
        let mut supply = VarSupply::new();
        let left = record(vec![("a", num())], true, "r");
        let right = record(vec![("b", num())], true, "r");
        assert!(matches!(
            unify(&left, &right, &mut supply),
            Err(TypeError::RowMismatch(_, _))
        ));
    }

    #[test]
    fn test_compose_law() {
        let s2 = Substitution::singleton("a", Type::list(Type::var("b")));
        let s1 = Substitution::singleton("b", num());
        let composed = s1.compose(&s2).unwrap();
        let ty = Type::func(vec![Type::var("a")], Type::var("b"));
        assert_eq!(
            composed.apply(&ty).unwrap(),
            s1.apply(&s2.apply(&ty).unwrap()).unwrap()
        );
    }

    #[test]
    fn test_apply_merges_row_tail() {
        let inner = record(vec![("b", Type::string())], true, "r2");
        let s = Substitution::singleton("r1", inner);
        let outer = record(vec![("a", num())], true, "r1");
        let merged = s.apply(&outer).unwrap();
        match merged {
            Type::Rec(row) => {
                assert_eq!(row.items.len(), 2);
                assert_eq!(row.rest, "r2");
                assert!(row.open);
            }
            other => panic!("expected a row, got {other}"),
        }
    }

    #[test]
    fn test_apply_merge_outer_items_win() {
        let inner = record(vec![("a", Type::string())], true, "r2");
        let s = Substitution::singleton("r1", inner);
        let outer = record(vec![("a", num())], true, "r1");
        match s.apply(&outer).unwrap() {
            Type::Rec(row) => assert_eq!(row.items["a"], num()),
            other => panic!("expected a row, got {other}"),
        }
    }

    #[test]
    fn test_apply_row_tail_to_cons_is_kind_error() {
        let s = Substitution::singleton("r1", num());
        let outer = record(vec![("a", num())], true, "r1");
        assert!(matches!(
            s.apply(&outer),
            Err(TypeError::KindMismatch(_, _))
        ));
    }

    #[test]
    fn test_apply_scheme_respects_quantified() {
        let s = Substitution::singleton("t", num());
        let scheme = Scheme::new(
            vec!["t".to_string()],
            Type::func(vec![Type::var("t")], Type::var("t")),
        );
        let applied = s.apply_scheme(&scheme).unwrap();
        assert_eq!(applied, scheme);
    }

    #[test]
    fn test_generalize_and_instantiate() {
        let env = TypeEnv::new();
        let ty = Type::func(vec![Type::var("a")], Type::var("a"));
        let scheme = env.generalize(&ty);
        assert_eq!(scheme.quantified, vec!["a".to_string()]);

        let mut supply = VarSupply::new();
        let inst = instantiate(&scheme, &mut supply).unwrap();
        assert_eq!(inst, Type::func(vec![Type::var("T0")], Type::var("T0")));
    }

    #[test]
    fn test_generalize_skips_env_vars() {
        let mut env = TypeEnv::new();
        env.bind("x", Scheme::monomorphic(Type::var("a")));
        let ty = Type::func(vec![Type::var("a")], Type::var("b"));
        let scheme = env.generalize(&ty);
        assert_eq!(scheme.quantified, vec!["b".to_string()]);
    }

    #[test]
    fn test_infer_literals() {
        let env = TypeEnv::new();
        assert_eq!(typecheck(&expr(ExprKind::Num(1.0)), &env).unwrap(), num());
        assert_eq!(
            typecheck(&expr(ExprKind::Str("s".to_string())), &env).unwrap(),
            Type::string()
        );
    }

    #[test]
    fn test_infer_unbound_variable() {
        let env = TypeEnv::new();
        assert!(matches!(
            typecheck(&expr(ExprKind::Id("x".to_string())), &env),
            Err(TypeError::UnboundVariable(name)) if name == "x"
        ));
    }

    #[test]
    fn test_infer_identity_lambda() {
        let env = TypeEnv::new();
        let lam = expr(ExprKind::Lam(
            vec!["x".to_string()],
            Box::new(expr(ExprKind::Id("x".to_string()))),
        ));
        let ty = typecheck(&lam, &env).unwrap();
        match ty {
            Type::Cons(name, args) => {
                assert_eq!(name, FUNC);
                assert_eq!(args.len(), 2);
                assert_eq!(args[0], args[1]);
            }
            other => panic!("expected a function, got {other}"),
        }
    }

    #[test]
    fn test_infer_record_is_closed() {
        let env = TypeEnv::new();
        let rec = expr(ExprKind::Rec(vec![(
            "a".to_string(),
            expr(ExprKind::Num(1.0)),
        )]));
        match typecheck(&rec, &env).unwrap() {
            Type::Rec(row) => {
                assert!(!row.union);
                assert!(!row.open);
                assert_eq!(row.items["a"], num());
            }
            other => panic!("expected a row, got {other}"),
        }
    }

    #[test]
    fn test_infer_tag_is_open_union() {
        let env = TypeEnv::new();
        let tag = expr(ExprKind::Cons("Ok".to_string(), None));
        match typecheck(&tag, &env).unwrap() {
            Type::Rec(row) => {
                assert!(row.union);
                assert!(row.open);
                assert_eq!(row.items["Ok"], Type::unit());
            }
            other => panic!("expected a row, got {other}"),
        }
    }

    #[test]
    fn test_infer_list_unifies_elements() {
        let env = TypeEnv::new();
        let list = expr(ExprKind::List(vec![
            expr(ExprKind::Num(1.0)),
            expr(ExprKind::Num(2.0)),
        ]));
        assert_eq!(typecheck(&list, &env).unwrap(), Type::list(num()));

        let bad = expr(ExprKind::List(vec![
            expr(ExprKind::Num(1.0)),
            expr(ExprKind::Str("s".to_string())),
        ]));
        assert!(typecheck(&bad, &env).is_err());
    }

    #[test]
    fn test_infer_application() {
        let mut env = TypeEnv::new();
        env.bind(
            "inc",
            Scheme::monomorphic(Type::func(vec![num()], num())),
        );
        let call = expr(ExprKind::App(
            Box::new(expr(ExprKind::Id("inc".to_string()))),
            vec![expr(ExprKind::Num(1.0))],
        ));
        assert_eq!(typecheck(&call, &env).unwrap(), num());
    }

    #[test]
    fn test_infer_field_access_opens_row() {
        let env = TypeEnv::new();
        let lam = expr(ExprKind::Lam(
            vec!["r".to_string()],
            Box::new(expr(ExprKind::Acc(
                Box::new(expr(ExprKind::Id("r".to_string()))),
                "age".to_string(),
            ))),
        ));
        match typecheck(&lam, &env).unwrap() {
            Type::Cons(name, args) => {
                assert_eq!(name, FUNC);
                match &args[0] {
                    Type::Rec(row) => {
                        assert!(!row.union);
                        assert!(row.open);
                        assert_eq!(row.items["age"], args[1]);
                    }
                    other => panic!("expected a row parameter, got {other}"),
                }
            }
            other => panic!("expected a function, got {other}"),
        }
    }

    #[test]
    fn test_infer_match_without_default_closes_scrutinee() {
        let env = TypeEnv::new();
        // when Ok(1) is Ok(x) -> x
        let scrutinee = expr(ExprKind::Cons(
            "Ok".to_string(),
            Some(Box::new(expr(ExprKind::Num(1.0)))),
        ));
        let case_pat = Pattern::new(
            PatKind::Cons(
                "Ok".to_string(),
                Some(Box::new(Pattern::new(
                    PatKind::Id("x".to_string()),
                    Span::default(),
                ))),
            ),
            Span::default(),
        );
        let m = expr(ExprKind::Match {
            scrutinee: Box::new(scrutinee),
            cases: vec![(case_pat, expr(ExprKind::Id("x".to_string())))],
            otherwise: None,
        });
        assert_eq!(typecheck(&m, &env).unwrap(), num());
    }

    #[test]
    fn test_infer_match_on_non_union_fails() {
        let env = TypeEnv::new();
        let m = expr(ExprKind::Match {
            scrutinee: Box::new(expr(ExprKind::Num(1.0))),
            cases: vec![(
                Pattern::new(PatKind::Cons("Ok".to_string(), None), Span::default()),
                expr(ExprKind::Num(1.0)),
            )],
            otherwise: None,
        });
        assert!(matches!(
            typecheck(&m, &env),
            Err(TypeError::KindMismatch(_, _))
        ));
    }
}
