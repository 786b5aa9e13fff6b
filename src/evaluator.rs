use crate::ast::{BlockStatement, Expression, InfixOp, PrefixOp, Program, Statement};
use crate::builtins::{Builtins, Io};
use crate::environment::Environment;
use crate::error::{KestrelError, RuntimeError};
use crate::value::{Function, HashPair, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Non-local exits out of an evaluation: a `return` travelling up to its
/// call site, or an error travelling up to the top.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Self {
        Signal::Error(error)
    }
}

pub type Eval<T> = Result<T, Signal>;

fn error<T>(message: String) -> Eval<T> {
    Err(Signal::Error(RuntimeError::new(message)))
}

/// Tree-walking evaluator.
///
/// Holds no bindings itself: every entry point takes the environment to
/// run in, so one evaluator can serve many independent programs.
pub struct Evaluator {
    builtins: Builtins,
    io: Io,
}

impl Evaluator {
    pub fn new(builtins: Builtins) -> Self {
        Self::with_io(builtins, Io::stdio())
    }

    pub fn with_io(builtins: Builtins, io: Io) -> Self {
        Self { builtins, io }
    }

    pub fn io(&mut self) -> &mut Io {
        &mut self.io
    }

    /// Run every statement of `program` in `env`.
    ///
    /// Yields the value of the last statement, or `None` when that statement
    /// is a binding. A top-level `return` ends the program with its value.
    #[tracing::instrument(level = "debug", skip_all, fields(statements = program.statements.len()))]
    pub fn evaluate_program(
        &mut self,
        program: &Program,
        env: &Environment,
    ) -> Result<Option<Value>, KestrelError> {
        let outcome = self.evaluate_statements(program, env);
        // frames left behind by calls that captured closures are only freed
        // by the collector
        let freed = Environment::collect_cycles();
        tracing::trace!(freed, "program finished");
        outcome
    }

    fn evaluate_statements(
        &mut self,
        program: &Program,
        env: &Environment,
    ) -> Result<Option<Value>, KestrelError> {
        let mut result = None;

        for statement in &program.statements {
            match self.evaluate_statement(statement, env) {
                Ok(value) => result = value,
                Err(Signal::Return(value)) => return Ok(Some(value)),
                Err(Signal::Error(error)) => {
                    tracing::debug!(error = %error, "evaluation failed");
                    return Err(error.at(statement.span()));
                }
            }
        }

        Ok(result)
    }

    pub fn evaluate_statement(
        &mut self,
        statement: &Statement,
        env: &Environment,
    ) -> Eval<Option<Value>> {
        match statement {
            Statement::Let { name, value, .. } => {
                let value = self.evaluate_expression(value, env)?;
                env.set(name.value.clone(), value);
                Ok(None)
            }
            Statement::Return { value, .. } => {
                let value = self.evaluate_expression(value, env)?;
                Err(Signal::Return(value))
            }
            Statement::Expression { expression, .. } => {
                Ok(Some(self.evaluate_expression(expression, env)?))
            }
        }
    }

    /// Blocks share the enclosing frame and pass a `return` through
    /// unchanged; only a call site unwraps it.
    fn evaluate_block(&mut self, block: &BlockStatement, env: &Environment) -> Eval<Option<Value>> {
        let mut result = None;
        for statement in &block.statements {
            result = self.evaluate_statement(statement, env)?;
        }
        Ok(result)
    }

    pub fn evaluate_expression(&mut self, expression: &Expression, env: &Environment) -> Eval<Value> {
        match expression {
            Expression::Identifier(ident) => self.evaluate_identifier(&ident.value, env),
            Expression::Integer { value, .. } => Ok(Value::Integer(*value)),
            Expression::String { value, .. } => Ok(Value::String(value.clone())),
            Expression::Boolean { value, .. } => Ok(Value::Boolean(*value)),
            Expression::Prefix {
                operator, right, ..
            } => {
                let right = self.evaluate_expression(right, env)?;
                evaluate_prefix(*operator, right)
            }
            Expression::Infix {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.evaluate_expression(left, env)?;
                let right = self.evaluate_expression(right, env)?;
                evaluate_infix(*operator, left, right)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                let condition = self.evaluate_expression(condition, env)?;
                let branch = if condition.is_truthy() {
                    Some(consequence)
                } else {
                    alternative.as_ref()
                };
                match branch {
                    Some(block) => Ok(self.evaluate_block(block, env)?.unwrap_or(Value::Null)),
                    None => Ok(Value::Null),
                }
            }
            Expression::Function(literal) => Ok(Value::Function(Rc::new(Function {
                literal: Rc::clone(literal),
                env: env.clone(),
            }))),
            Expression::Call {
                callee, arguments, ..
            } => {
                let callee = self.evaluate_expression(callee, env)?;
                let arguments = self.evaluate_expressions(arguments, env)?;
                self.apply_function(callee, arguments)
            }
            Expression::Array { elements, .. } => {
                let elements = self.evaluate_expressions(elements, env)?;
                Ok(Value::from(elements))
            }
            Expression::Index { left, index, .. } => {
                let left = self.evaluate_expression(left, env)?;
                let index = self.evaluate_expression(index, env)?;
                evaluate_index(left, index)
            }
            Expression::Hash { pairs, .. } => self.evaluate_hash_literal(pairs, env),
        }
    }

    fn evaluate_identifier(&self, name: &str, env: &Environment) -> Eval<Value> {
        if let Some(builtin) = self.builtins.get(name) {
            return Ok(Value::Builtin(builtin));
        }
        match env.get(name) {
            Some(value) => Ok(value),
            None => error(format!("identifier not found: {}", name)),
        }
    }

    /// Left to right, stopping at the first error.
    fn evaluate_expressions(
        &mut self,
        expressions: &[Expression],
        env: &Environment,
    ) -> Eval<Vec<Value>> {
        expressions
            .iter()
            .map(|expression| self.evaluate_expression(expression, env))
            .collect()
    }

    fn evaluate_hash_literal(
        &mut self,
        pairs: &[(Expression, Expression)],
        env: &Environment,
    ) -> Eval<Value> {
        let mut hash = BTreeMap::new();

        for (key_expr, value_expr) in pairs {
            let key = self.evaluate_expression(key_expr, env)?;
            let value = self.evaluate_expression(value_expr, env)?;
            let hash_key = key.hash_key()?;
            hash.insert(hash_key, HashPair { key, value });
        }

        Ok(Value::Hash(Rc::new(hash)))
    }

    /// Call `callee` with already-evaluated arguments.
    ///
    /// Arity is not checked: extra arguments are dropped and missing
    /// parameters stay unbound.
    pub fn apply_function(&mut self, callee: Value, arguments: Vec<Value>) -> Eval<Value> {
        match callee {
            Value::Function(function) => {
                tracing::trace!(
                    parameters = function.literal.parameters.len(),
                    arguments = arguments.len(),
                    "apply function"
                );
                let call_env = function.env.enclosed();
                for (parameter, argument) in function.literal.parameters.iter().zip(arguments) {
                    call_env.set(parameter.value.clone(), argument);
                }

                match self.evaluate_block(&function.literal.body, &call_env) {
                    Ok(value) => Ok(value.unwrap_or(Value::Null)),
                    Err(Signal::Return(value)) => Ok(value),
                    Err(signal) => Err(signal),
                }
            }
            Value::Builtin(builtin) => {
                tracing::trace!(name = builtin.name, "apply builtin");
                Ok(builtin.call(&mut self.io, &arguments)?)
            }
            other => error(format!("not a function: {}", other.type_name())),
        }
    }
}

fn evaluate_prefix(operator: PrefixOp, right: Value) -> Eval<Value> {
    match operator {
        PrefixOp::Not => Ok(Value::Boolean(match right {
            Value::Boolean(b) => !b,
            Value::Null => true,
            _ => false,
        })),
        PrefixOp::Negate => match right {
            Value::Integer(n) => Ok(Value::Integer(n.wrapping_neg())),
            other => error(format!("unknown operator: -{}", other.type_name())),
        },
    }
}

fn evaluate_infix(operator: InfixOp, left: Value, right: Value) -> Eval<Value> {
    match (&left, &right) {
        (Value::Integer(l), Value::Integer(r)) => evaluate_integer_infix(operator, *l, *r),
        (Value::String(l), Value::String(r)) => match operator {
            InfixOp::Add => Ok(Value::String(format!("{}{}", l, r))),
            _ => error(format!("unknown operator: STRING {} STRING", operator)),
        },
        _ if left.type_name() != right.type_name() => error(format!(
            "type mismatch: {} {} {}",
            left.type_name(),
            operator,
            right.type_name()
        )),
        _ => match operator {
            InfixOp::Equal => Ok(Value::Boolean(left.is_identical(&right))),
            InfixOp::NotEqual => Ok(Value::Boolean(!left.is_identical(&right))),
            _ => error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                operator,
                right.type_name()
            )),
        },
    }
}

/// 64-bit two's complement arithmetic; division truncates toward zero.
fn evaluate_integer_infix(operator: InfixOp, left: i64, right: i64) -> Eval<Value> {
    let value = match operator {
        InfixOp::Add => Value::Integer(left.wrapping_add(right)),
        InfixOp::Subtract => Value::Integer(left.wrapping_sub(right)),
        InfixOp::Multiply => Value::Integer(left.wrapping_mul(right)),
        InfixOp::Divide => {
            if right == 0 {
                return error("division by zero: INTEGER / INTEGER".to_string());
            }
            Value::Integer(left.wrapping_div(right))
        }
        InfixOp::Less => Value::Boolean(left < right),
        InfixOp::Greater => Value::Boolean(left > right),
        InfixOp::Equal => Value::Boolean(left == right),
        InfixOp::NotEqual => Value::Boolean(left != right),
    };
    Ok(value)
}

fn evaluate_index(left: Value, index: Value) -> Eval<Value> {
    match (&left, &index) {
        (Value::Array(elements), Value::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Hash(pairs), _) => {
            let key = index.hash_key()?;
            Ok(pairs
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Value::Null))
        }
        _ => error(format!("index operator not supported: {}", left.type_name())),
    }
}
