use thiserror::Error;

/// One of the closed set of names a template may reference. Any other
/// identifier inside `{...}` is treated as literal text, per the
/// alternative-or-literal disambiguation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    Year,
    Month,
    Day,
    DayOfYear,
    Name,
    NameNoExt,
    Ext,
    Directory,
    Number,
    District,
    City,
    County,
    State,
    Country,
}

impl Variable {
    const ALL: &'static [(&'static str, Variable)] = &[
        ("year", Variable::Year),
        ("month", Variable::Month),
        ("day", Variable::Day),
        ("dayOfYear", Variable::DayOfYear),
        ("name", Variable::Name),
        ("namenoext", Variable::NameNoExt),
        ("ext", Variable::Ext),
        ("directory", Variable::Directory),
        ("number", Variable::Number),
        ("district", Variable::District),
        ("city", Variable::City),
        ("county", Variable::County),
        ("state", Variable::State),
        ("country", Variable::Country),
    ];

    fn lookup(name: &str) -> Option<Variable> {
        Self::ALL
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, variable)| *variable)
    }

    pub fn name(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, variable)| *variable == self)
            .map(|(name, _)| *name)
            .expect("every Variable has an entry in ALL")
    }

    pub fn is_location(self) -> bool {
        matches!(
            self,
            Variable::District
                | Variable::City
                | Variable::County
                | Variable::State
                | Variable::Country
        )
    }
}

/// A threshold gate on an alternative: it only contributes its value when
/// the Statistics Collector's observed count for `(variable, raw value)`
/// falls in `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub min: u64,
    pub max: u64,
}

impl Condition {
    pub fn allows(self, count: u64) -> bool {
        count >= self.min && count <= self.max
    }
}

/// One `|`-separated candidate inside a `{...}` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alternative {
    Variable {
        variable: Variable,
        condition: Option<Condition>,
    },
    Literal(String),
}

/// A full `{a|b|c}` expression: alternatives are tried in order, the
/// first whose condition (if any) is satisfied wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableExpression {
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Literal(String),
    Expression(VariableExpression),
}

/// One `/`-separated path component of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    pub parts: Vec<Part>,
}

impl Segment {
    /// A segment collapses out of the rendered path iff its resolved text
    /// is empty and it references at least one variable.
    pub fn has_variable(&self) -> bool {
        self.parts.iter().any(|part| matches!(part, Part::Expression(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateTree {
    pub segments: Vec<Segment>,
}

impl TemplateTree {
    /// Every variable referenced anywhere in the template, for the
    /// Statistics Collector to know what to count during the scan pass.
    pub fn referenced_variables(&self) -> Vec<Variable> {
        let mut found = Vec::new();
        for segment in &self.segments {
            for part in &segment.parts {
                if let Part::Expression(expr) = part {
                    for alt in &expr.alternatives {
                        if let Alternative::Variable { variable, .. } = alt {
                            if !found.contains(variable) {
                                found.push(*variable);
                            }
                        }
                    }
                }
            }
        }
        found
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("template syntax error at position {position}: {message}")]
pub struct TemplateSyntaxError {
    pub position: usize,
    pub message: String,
}

impl TemplateSyntaxError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

pub fn validate_template(input: &str) -> Result<(), TemplateSyntaxError> {
    parse_template(input).map(|_| ())
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

pub fn parse_template(input: &str) -> Result<TemplateTree, TemplateSyntaxError> {
    if input.is_empty() {
        return Err(TemplateSyntaxError::new(0, "template must not be empty"));
    }

    let mut segments = Vec::new();
    for (index, raw_segment) in input.split('/').enumerate() {
        if raw_segment.is_empty() {
            let position = input
                .match_indices('/')
                .nth(index.saturating_sub(1))
                .map(|(pos, _)| pos)
                .unwrap_or(0);
            return Err(TemplateSyntaxError::new(position, "empty path segment"));
        }
        segments.push(parse_segment(raw_segment)?);
    }

    Ok(TemplateTree { segments })
}

fn parse_segment(raw: &str) -> Result<Segment, TemplateSyntaxError> {
    let mut scanner = Scanner::new(raw);
    let mut parts = Vec::new();
    let mut literal = String::new();

    while let Some(ch) = scanner.peek() {
        match ch {
            '{' => {
                if !literal.is_empty() {
                    parts.push(Part::Literal(std::mem::take(&mut literal)));
                }
                scanner.advance();
                parts.push(Part::Expression(parse_expression(&mut scanner)?));
            }
            '}' => {
                return Err(TemplateSyntaxError::new(scanner.pos, "unexpected '}'"));
            }
            _ => {
                literal.push(ch);
                scanner.advance();
            }
        }
    }

    if !literal.is_empty() {
        parts.push(Part::Literal(literal));
    }

    Ok(Segment { parts })
}

fn parse_expression(scanner: &mut Scanner) -> Result<VariableExpression, TemplateSyntaxError> {
    let mut alternatives = Vec::new();

    loop {
        alternatives.push(parse_alternative(scanner)?);
        match scanner.peek() {
            Some('|') => {
                scanner.advance();
            }
            Some('}') => {
                scanner.advance();
                break;
            }
            Some(_) => unreachable!("parse_alternative stops only at '|' or '}'"),
            None => {
                return Err(TemplateSyntaxError::new(
                    scanner.pos,
                    "unterminated variable expression, expected '}'",
                ));
            }
        }
    }

    if alternatives.is_empty() {
        return Err(TemplateSyntaxError::new(
            scanner.pos,
            "variable expression must have at least one alternative",
        ));
    }

    Ok(VariableExpression { alternatives })
}

fn parse_alternative(scanner: &mut Scanner) -> Result<Alternative, TemplateSyntaxError> {
    let start = scanner.pos;
    let mut raw = String::new();

    while let Some(ch) = scanner.peek() {
        if ch == '|' || ch == '}' {
            break;
        }
        raw.push(ch);
        scanner.advance();
    }

    if let Some(paren_pos) = raw.find('?') {
        let (name, condition_src) = raw.split_at(paren_pos);
        let condition_src = &condition_src[1..];
        let Some(variable) = Variable::lookup(name) else {
            return Err(TemplateSyntaxError::new(
                start,
                format!("'{name}' is not a known variable and cannot carry a condition"),
            ));
        };
        let condition = parse_condition(condition_src, start)?;
        return Ok(Alternative::Variable {
            variable,
            condition: Some(condition),
        });
    }

    if let Some(variable) = Variable::lookup(&raw) {
        return Ok(Alternative::Variable {
            variable,
            condition: None,
        });
    }

    Ok(Alternative::Literal(raw))
}

fn parse_condition(src: &str, start: usize) -> Result<Condition, TemplateSyntaxError> {
    let mut min = None;
    let mut max = None;

    for clause in src.split(',') {
        let clause = clause.trim();
        if let Some(value) = clause.strip_prefix("min=") {
            min = Some(value.parse::<u64>().map_err(|_| {
                TemplateSyntaxError::new(start, format!("invalid min value '{value}'"))
            })?);
        } else if let Some(value) = clause.strip_prefix("max=") {
            max = Some(value.parse::<u64>().map_err(|_| {
                TemplateSyntaxError::new(start, format!("invalid max value '{value}'"))
            })?);
        } else {
            return Err(TemplateSyntaxError::new(
                start,
                format!("unrecognized condition clause '{clause}'"),
            ));
        }
    }

    let min = min.unwrap_or(0);
    let max = max.unwrap_or(u64::MAX);
    if min > max {
        return Err(TemplateSyntaxError::new(start, "condition 'min' exceeds 'max'"));
    }

    Ok(Condition { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_literal_segments() {
        let tree = parse_template("incoming/flat").expect("should parse");
        assert_eq!(tree.segments.len(), 2);
        assert_eq!(
            tree.segments[0].parts,
            vec![Part::Literal("incoming".to_string())]
        );
    }

    #[test]
    fn parses_single_variable_segment() {
        let tree = parse_template("{year}/{month}/{name}").expect("should parse");
        assert_eq!(tree.segments.len(), 3);
        match &tree.segments[0].parts[0] {
            Part::Expression(expr) => {
                assert_eq!(
                    expr.alternatives,
                    vec![Alternative::Variable {
                        variable: Variable::Year,
                        condition: None
                    }]
                );
            }
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn parses_alternatives_with_condition_and_literal_fallback() {
        let tree = parse_template("{city?min=5,max=999|unknown}").expect("should parse");
        let segment = &tree.segments[0];
        match &segment.parts[0] {
            Part::Expression(expr) => {
                assert_eq!(expr.alternatives.len(), 2);
                assert_eq!(
                    expr.alternatives[0],
                    Alternative::Variable {
                        variable: Variable::City,
                        condition: Some(Condition { min: 5, max: 999 })
                    }
                );
                assert_eq!(expr.alternatives[1], Alternative::Literal("unknown".to_string()));
            }
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn unknown_identifier_with_condition_is_rejected() {
        let err = parse_template("{bogus?min=1,max=2}").unwrap_err();
        assert!(err.message.contains("not a known variable"));
    }

    #[test]
    fn unknown_identifier_without_condition_is_literal() {
        let tree = parse_template("{bogus}").expect("should parse as literal alternative");
        assert_eq!(
            tree.segments[0].parts[0],
            Part::Expression(VariableExpression {
                alternatives: vec![Alternative::Literal("bogus".to_string())]
            })
        );
    }

    #[test]
    fn rejects_empty_template() {
        assert!(parse_template("").is_err());
    }

    #[test]
    fn rejects_empty_path_segment() {
        assert!(parse_template("{year}//{name}").is_err());
    }

    #[test]
    fn rejects_unterminated_expression() {
        assert!(parse_template("{year").is_err());
    }

    #[test]
    fn rejects_min_greater_than_max() {
        assert!(parse_template("{city?min=9,max=1}").is_err());
    }

    #[test]
    fn condition_with_only_max_defaults_min_to_zero() {
        let tree = parse_template("{city?max=10}").expect("should parse");
        let Part::Expression(expr) = &tree.segments[0].parts[0] else {
            panic!("expected an expression part");
        };
        let Alternative::Variable { condition, .. } = &expr.alternatives[0] else {
            panic!("expected a variable alternative");
        };
        let condition = condition.as_ref().expect("condition should be present");
        assert_eq!(condition.min, 0);
        assert_eq!(condition.max, 10);
    }

    #[test]
    fn condition_with_only_min_defaults_max_to_unbounded() {
        let tree = parse_template("{city?min=5}").expect("should parse");
        let Part::Expression(expr) = &tree.segments[0].parts[0] else {
            panic!("expected an expression part");
        };
        let Alternative::Variable { condition, .. } = &expr.alternatives[0] else {
            panic!("expected a variable alternative");
        };
        let condition = condition.as_ref().expect("condition should be present");
        assert_eq!(condition.min, 5);
        assert_eq!(condition.max, u64::MAX);
    }

    #[test]
    fn referenced_variables_collects_across_segments_without_duplicates() {
        let tree = parse_template("{year}/{year}-{month}/{name}").expect("should parse");
        let vars = tree.referenced_variables();
        assert_eq!(vars, vec![Variable::Year, Variable::Month, Variable::Name]);
    }

    #[test]
    fn segment_has_variable_detects_mixed_literal_and_expression() {
        let tree = parse_template("prefix-{city}").expect("should parse");
        assert!(tree.segments[0].has_variable());

        let plain = parse_template("plain").expect("should parse");
        assert!(!plain.segments[0].has_variable());
    }
}
