use std::cmp::Ordering;

use crate::error::ArithmeticError;

/// Outcome of the most recent `CMP`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Flag {
    Less = 0b100,
    Greater = 0b010,
    Equal = 0b001,
    /// No comparison has run yet.
    #[default]
    Uninit = 0b000,
}

impl Flag {
    pub fn compare(a: u8, b: u8) -> Self {
        match a.cmp(&b) {
            Ordering::Less => Flag::Less,
            Ordering::Greater => Flag::Greater,
            Ordering::Equal => Flag::Equal,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Operations selected by opcodes with the ALU bit set.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Cmp,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

/// Result written back by the machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AluOutput {
    /// Replaces the first register.
    Value(u8),
    /// Replaces the flags; registers are untouched.
    Flag(Flag),
}

impl AluOp {
    const ALL: [AluOp; 11] = [
        AluOp::Add,
        AluOp::Sub,
        AluOp::Mul,
        AluOp::Div,
        AluOp::Mod,
        AluOp::Cmp,
        AluOp::And,
        AluOp::Or,
        AluOp::Xor,
        AluOp::Shl,
        AluOp::Shr,
    ];

    pub fn opcode(self) -> u8 {
        match self {
            AluOp::Add => 0b1010_0000,
            AluOp::Sub => 0b1010_0001,
            AluOp::Mul => 0b1010_0010,
            AluOp::Div => 0b1010_0011,
            AluOp::Mod => 0b1010_0100,
            AluOp::Cmp => 0b1010_0111,
            AluOp::And => 0b1010_1000,
            AluOp::Or => 0b1010_1010,
            AluOp::Xor => 0b1010_1011,
            AluOp::Shl => 0b1010_1100,
            AluOp::Shr => 0b1010_1101,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "ADD",
            AluOp::Sub => "SUB",
            AluOp::Mul => "MUL",
            AluOp::Div => "DIV",
            AluOp::Mod => "MOD",
            AluOp::Cmp => "CMP",
            AluOp::And => "AND",
            AluOp::Or => "OR",
            AluOp::Xor => "XOR",
            AluOp::Shl => "SHL",
            AluOp::Shr => "SHR",
        }
    }

    pub fn apply(self, a: u8, b: u8) -> Result<AluOutput, ArithmeticError> {
        let div_zero = ArithmeticError::DivisionByZero {
            opcode: self.opcode(),
        };
        let value = match self {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Mul => a.wrapping_mul(b),
            AluOp::Div => a.checked_div(b).ok_or(div_zero)?,
            AluOp::Mod => a.checked_rem(b).ok_or(div_zero)?,
            AluOp::Cmp => return Ok(AluOutput::Flag(Flag::compare(a, b))),
            AluOp::And => a & b,
            AluOp::Or => a | b,
            AluOp::Xor => a ^ b,
            // Shifting out every bit leaves zero
            AluOp::Shl => a.checked_shl(u32::from(b)).unwrap_or(0),
            AluOp::Shr => a.checked_shr(u32::from(b)).unwrap_or(0),
        };
        Ok(AluOutput::Value(value))
    }
}

impl TryFrom<u8> for AluOp {
    type Error = ArithmeticError;

    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|op| op.opcode() == opcode)
            .ok_or(ArithmeticError::UnsupportedOperation { opcode })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_wraps() {
        assert_eq!(AluOp::Add.apply(8, 9), Ok(AluOutput::Value(17)));
        assert_eq!(AluOp::Add.apply(250, 10), Ok(AluOutput::Value(4)));
        assert_eq!(AluOp::Sub.apply(3, 5), Ok(AluOutput::Value(254)));
        assert_eq!(AluOp::Mul.apply(8, 9), Ok(AluOutput::Value(72)));
        assert_eq!(AluOp::Mul.apply(16, 16), Ok(AluOutput::Value(0)));
        assert_eq!(AluOp::Div.apply(72, 9), Ok(AluOutput::Value(8)));
        assert_eq!(AluOp::Mod.apply(17, 5), Ok(AluOutput::Value(2)));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(
            AluOp::Div.apply(1, 0),
            Err(ArithmeticError::DivisionByZero {
                opcode: 0b1010_0011
            })
        );
        assert_eq!(
            AluOp::Mod.apply(1, 0),
            Err(ArithmeticError::DivisionByZero {
                opcode: 0b1010_0100
            })
        );
    }

    #[test]
    fn bitwise() {
        assert_eq!(AluOp::And.apply(0b1100, 0b1010), Ok(AluOutput::Value(0b1000)));
        assert_eq!(AluOp::Or.apply(0b1100, 0b1010), Ok(AluOutput::Value(0b1110)));
        assert_eq!(AluOp::Xor.apply(0b1100, 0b1010), Ok(AluOutput::Value(0b0110)));
        assert_eq!(AluOp::Shl.apply(0b0000_0011, 2), Ok(AluOutput::Value(0b1100)));
        assert_eq!(AluOp::Shr.apply(0b1100, 2), Ok(AluOutput::Value(0b0011)));
        assert_eq!(AluOp::Shl.apply(0xFF, 8), Ok(AluOutput::Value(0)));
        assert_eq!(AluOp::Shr.apply(0xFF, 200), Ok(AluOutput::Value(0)));
    }

    #[test]
    fn compare_sets_exactly_one_flag() {
        let cases = [
            (1, 2, Flag::Less),
            (2, 1, Flag::Greater),
            (2, 2, Flag::Equal),
        ];
        for (a, b, expected) in cases {
            let Ok(AluOutput::Flag(flag)) = AluOp::Cmp.apply(a, b) else {
                panic!("CMP {a}, {b} did not produce a flag");
            };
            assert_eq!(flag, expected);
            assert_eq!(flag.bits().count_ones(), 1);
        }
        assert_eq!(Flag::default().bits(), 0);
    }

    #[test]
    fn opcodes_round_trip_and_are_unique() {
        for op in AluOp::ALL {
            assert_eq!(op.opcode() & 0b0010_0000, 0b0010_0000, "{op:?}");
            assert_eq!(AluOp::try_from(op.opcode()), Ok(op));
        }
        assert_eq!(
            AluOp::try_from(0b1010_0101),
            Err(ArithmeticError::UnsupportedOperation {
                opcode: 0b1010_0101
            })
        );
    }
}
