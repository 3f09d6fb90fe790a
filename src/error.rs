use crate::token::TokenType;
use custom_error::custom_error;

custom_error! {
    #[derive(Clone, PartialEq)]
    pub ScriptError

    // Lexing
    BadCharacter{character: char, line: usize} = "bad character '{character}' on line {line}",
    BadEscape{character: char, line: usize} = "unknown escape '\\{character}' on line {line}",
    UnterminatedString{line: usize} = "unterminated string starting on line {line}",
    BadNumber{text: String, line: usize} = "number '{text}' on line {line} is out of range",

    // Parsing
    UnexpectedToken{token_type: TokenType, value: String, line: usize, index: usize} = "unexpected {token_type} '{value}' on line {line} at character {index}",
    UnexpectedEnd = "unexpected end of input",
    NestingTooDeep{line: usize} = "nesting too deep on line {line}",
    CannotUnquote{value: String} = "cannot unquote {value}: not a quoted value",

    // Evaluation
    UnresolvedSymbol{name: String} = "unresolved symbol '{name}'",
    NotCallable{target: String} = "'{target}' is not callable",
    WrongArity{name: String, expected: usize, got: usize} = "function '{name}' takes {expected} arguments ({got} given)",
    MalformedAssignment = "wrong number of arguments for assignment",
    AssignToNonSymbol = "cannot assign to something that is not a symbol",
    MalformedDefinition{reason: &'static str} = "cannot define function: {reason}",
    RedefineBuiltin{name: String} = "cannot redefine the builtin '{name}'",
    AttributeNotSymbol = "attributes must be symbols",
    UnknownAttribute{name: String} = "unknown attribute '{name}'",
    NotADict{name: String} = "'{name}' does not hold a dictionary",

    // Builtins
    CannotConvert{value: String, target: &'static str} = "cannot convert {value} to {target}",
    UnsupportedOperand{operation: &'static str, type_name: &'static str} = "unsupported operand for '{operation}': {type_name}",
    DivisionByZero = "division by zero",
    IndexOutOfRange{index: i64, length: usize} = "index {index} out of range for length {length}",

    // Resource limits
    BudgetExhausted{steps: u64} = "evaluation budget of {steps} steps exhausted",
    RecursionLimit{depth: usize} = "recursion limit of {depth} frames exceeded"
}

pub type Result<T> = std::result::Result<T, ScriptError>;
