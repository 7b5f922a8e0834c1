use winnow::combinator::{alt, cut_err, delimited, opt, preceded, separated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till, take_while};

use super::ast::{Call, Param, ResponsePipeline};

// -- Whitespace -------------------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .context(StrContext::Label("identifier"))
        .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

fn escape(input: &mut &str) -> ModalResult<char> {
    match any.parse_next(input)? {
        '"' => Ok('"'),
        '\'' => Ok('\''),
        '\\' => Ok('\\'),
        '/' => Ok('/'),
        'n' => Ok('\n'),
        't' => Ok('\t'),
        'r' => Ok('\r'),
        'b' => Ok('\u{8}'),
        'f' => Ok('\u{c}'),
        '0' => Ok('\0'),
        'u' => take_while(4, |c: char| c.is_ascii_hexdigit())
            .try_map(|hex: &str| u32::from_str_radix(hex, 16))
            .verify_map(char::from_u32)
            .parse_next(input),
        _ => Err(ErrMode::from_input(input)),
    }
}

fn quoted_string(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut out = String::new();
    loop {
        let ch = cut_err(any)
            .context(StrContext::Expected(StrContextValue::CharLiteral('"')))
            .parse_next(input)?;
        match ch {
            '"' => return Ok(out),
            '\\' => {
                let escaped = cut_err(escape)
                    .context(StrContext::Label("escape sequence"))
                    .parse_next(input)?;
                out.push(escaped);
            }
            c => out.push(c),
        }
    }
}

fn raw_string(input: &mut &str) -> ModalResult<String> {
    delimited(
        '`',
        take_till(0.., '`'),
        cut_err('`').context(StrContext::Expected(StrContextValue::CharLiteral('`'))),
    )
    .map(str::to_owned)
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<Param> {
    let text = (
        opt('-'),
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .parse_next(input)?;

    if text.contains('.') {
        text.parse::<f64>()
            .map(Param::Float)
            .map_err(|_| ErrMode::from_input(input).cut())
    } else {
        text.parse::<i64>()
            .map(Param::Int)
            .map_err(|_| ErrMode::from_input(input).cut())
    }
}

fn param(input: &mut &str) -> ModalResult<Param> {
    alt((
        quoted_string.map(Param::String),
        raw_string.map(Param::String),
        number,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "string, integer or float literal",
    )))
    .parse_next(input)
}

// -- Calls ------------------------------------------------------------------

fn call(input: &mut &str) -> ModalResult<Call> {
    ws.parse_next(input)?;
    let first = ident.parse_next(input)?;
    let second = opt(preceded('.', cut_err(ident))).parse_next(input)?;
    let (module, name) = match second {
        Some(name) => (Some(first.to_owned()), name.to_owned()),
        None => (None, first.to_owned()),
    };

    ws.parse_next(input)?;
    cut_err('(')
        .context(StrContext::Expected(StrContextValue::CharLiteral('(')))
        .parse_next(input)?;
    let params: Vec<Param> = separated(0.., preceded(ws, param), (ws, ',')).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err(')')
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .parse_next(input)?;

    Ok(Call {
        module,
        name,
        params,
    })
}

// -- Pipeline ---------------------------------------------------------------

pub(super) fn response_pipeline(input: &mut &str) -> ModalResult<ResponsePipeline> {
    let filters: Vec<Call> = separated(0.., call, (ws, "->")).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err("=>")
        .context(StrContext::Expected(StrContextValue::StringLiteral("=>")))
        .parse_next(input)?;
    let response = cut_err(call).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(ResponsePipeline { filters, response })
}

#[cfg(test)]
mod tests {
    use super::super::parse_rule;
    use super::*;

    fn string(s: &str) -> Param {
        Param::String(s.to_owned())
    }

    #[test]
    fn test_parse_response_only() {
        let rule = parse_rule("=> StatusCode(204)").unwrap();
        assert!(rule.filters.is_empty());
        assert_eq!(rule.response.module, None);
        assert_eq!(rule.response.name, "StatusCode");
        assert_eq!(rule.response.params, vec![Param::Int(204)]);
    }

    #[test]
    fn test_parse_filter_chain() {
        let rule = parse_rule(
            r#"Method("GET") -> PathPattern("/index.html") => File(200, "index.html", "text/html")"#,
        )
        .unwrap();

        assert_eq!(rule.filters.len(), 2);
        assert_eq!(rule.filters[0].name, "Method");
        assert_eq!(rule.filters[0].params, vec![string("GET")]);
        assert_eq!(rule.filters[1].name, "PathPattern");
        assert_eq!(rule.response.name, "File");
        assert_eq!(
            rule.response.params,
            vec![Param::Int(200), string("index.html"), string("text/html")]
        );
    }

    #[test]
    fn test_parse_module_prefix() {
        let rule = parse_rule(r#"graphql.Query("{ a }") => http.Status(200)"#).unwrap();
        assert_eq!(rule.filters[0].module.as_deref(), Some("graphql"));
        assert_eq!(rule.filters[0].name, "Query");
        assert_eq!(rule.response.module.as_deref(), Some("http"));
    }

    #[test]
    fn test_parse_escapes() {
        let rule = parse_rule(r#"=> Json(201, "{\"ok\":true}\nA\\")"#).unwrap();
        assert_eq!(rule.response.params[1], string("{\"ok\":true}\nA\\"));
    }

    #[test]
    fn test_parse_raw_string() {
        let rule = parse_rule(r#"PathPattern(`.*\.png`) => File("default.png")"#).unwrap();
        assert_eq!(rule.filters[0].params, vec![string(r".*\.png")]);
    }

    #[test]
    fn test_parse_numbers() {
        let rule = parse_rule("=> Values(-3, 1.25, -0.5, 0)").unwrap();
        assert_eq!(
            rule.response.params,
            vec![
                Param::Int(-3),
                Param::Float(1.25),
                Param::Float(-0.5),
                Param::Int(0)
            ]
        );
    }

    #[test]
    fn test_parse_whitespace_is_insignificant() {
        let compact = parse_rule(r#"Method("POST")->Header("X-Env","test")=>Json(201,"{}")"#).unwrap();
        let spaced = parse_rule(
            "  Method( \"POST\" )\n  -> Header(\"X-Env\" ,  \"test\")\n  =>  Json( 201 , \"{}\" )  ",
        )
        .unwrap();
        assert_eq!(compact, spaced);
    }

    #[test]
    fn test_parse_empty_params() {
        let rule = parse_rule("Any() => Status(200)").unwrap();
        assert!(rule.filters[0].params.is_empty());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = r#"Query("page", "1") -> HeaderPresent("Authorization") => Json("[]")"#;
        assert_eq!(parse_rule(text).unwrap(), parse_rule(text).unwrap());
    }

    #[test]
    fn test_missing_response_is_error() {
        let err = parse_rule(r#"Method("GET")"#).unwrap_err();
        assert_eq!(err.rule(), r#"Method("GET")"#);
        assert_eq!(err.position(), 13);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(parse_rule(r#"=> Json("{"#).is_err());
    }

    #[test]
    fn test_unclosed_call_is_error() {
        let err = parse_rule(r#"Method("GET" => Status(200)"#).unwrap_err();
        assert!(err.to_string().contains("invalid rule"));
    }

    #[test]
    fn test_trailing_input_is_error() {
        assert!(parse_rule("=> Status(200) extra").is_err());
    }

    #[test]
    fn test_unknown_escape_is_error() {
        assert!(parse_rule(r#"=> Json("\q")"#).is_err());
    }

    #[test]
    fn test_bare_identifier_param_is_error() {
        assert!(parse_rule("Method(GET) => Status(200)").is_err());
    }

    #[test]
    fn test_call_parser_alone() {
        let mut input = r#"http.Header("a", "b")"#;
        let parsed = call(&mut input).unwrap();
        assert_eq!(parsed.signature(), "http.header(string,string)");
        assert!(input.is_empty());
    }
}
