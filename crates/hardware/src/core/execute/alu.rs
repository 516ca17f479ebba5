//! The arithmetic/logic unit.
//!
//! All arithmetic is 32-bit. Multiplies take one extra cycle; the execute
//! stage sequences that and only calls in on the final cycle. The predicate
//! outcomes follow the architecture's rules: additions capture the carry,
//! subtractions the borrow, everything else the low bit of the result.

use crate::common::SimError;
use crate::isa::Function;

/// Evaluates one ALU function over 32-bit operands.
///
/// `predicate` supplies the current predicate bit for `psel`.
///
/// # Errors
///
/// Returns an invalid-option fault for function codes with no ALU meaning
/// (`rmtnxipk` shares the encoding space but never reaches the ALU).
pub fn evaluate(
    function: Function,
    op1: i32,
    op2: i32,
    predicate: bool,
) -> Result<u32, SimError> {
    let result = match function {
        Function::Nor => !(op1 | op2),
        Function::And => op1 & op2,
        Function::Or => op1 | op2,
        Function::Xor => op1 ^ op2,

        Function::SetEq => (op1 == op2) as i32,
        Function::SetNe => (op1 != op2) as i32,
        Function::SetLt => (op1 < op2) as i32,
        Function::SetLtU => ((op1 as u32) < op2 as u32) as i32,
        Function::SetGte => (op1 >= op2) as i32,
        Function::SetGteU => (op1 as u32 >= op2 as u32) as i32,

        Function::Sll => ((op1 as u32) << (op2 as u32 & 0x1F)) as i32,
        Function::Srl => ((op1 as u32) >> (op2 as u32 & 0x1F)) as i32,
        Function::Sra => op1 >> (op2 as u32 & 0x1F),

        Function::AddU => op1.wrapping_add(op2),
        Function::SubU => op1.wrapping_sub(op2),

        Function::Psel => {
            if predicate {
                op1
            } else {
                op2
            }
        }

        Function::MulHw => ((i64::from(op1) * i64::from(op2)) >> 32) as i32,
        Function::MulLw => (i64::from(op1) * i64::from(op2)) as i32,
        Function::MulHwU => {
            ((u64::from(op1 as u32) * u64::from(op2 as u32)) >> 32) as i32
        }

        Function::Clz => op1.leading_zeros() as i32,

        Function::RmtNxIpk => {
            return Err(SimError::InvalidOption {
                context: "ALU function code",
                value: function as u32,
            });
        }
    };
    Ok(result as u32)
}

/// The predicate value an instruction computes alongside its result.
pub fn predicate_outcome(function: Function, op1: i32, op2: i32, result: u32) -> bool {
    match function {
        // The carry bit of the 32-bit addition.
        Function::AddU => {
            let wide = u64::from(op1 as u32) + u64::from(op2 as u32);
            (wide >> 32) != 0
        }
        // The borrow bit of the subtraction.
        Function::SubU => (op1 as u32) < (op2 as u32),
        // Everything else: the low bit of the result.
        _ => result & 1 != 0,
    }
}
