// 2.0: risk document. reads the exchange SPAN XML into typed portfolio nodes.
// two passes: quick-xml events into a small element tree, then the tree into typed nodes.
// every required child is checked here so the index never sees a half-filled node.
//
// layout (tags as the exchange writes them):
//   futPf  -> name, fut* -> pe, p, ra -> a*
//   oopPf  -> name, series* -> pe, opt* -> o, k, p, ra -> a*
//   phy    -> p
// portfolios and phy may sit at any depth; children are direct children only.

use crate::error::SpanError;
use crate::types::{parse_decimal, ExpiryKey, OptionType};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

const FUTURES_PORTFOLIO: &str = "futPf";
const OPTION_PORTFOLIO: &str = "oopPf";
const PHYSICAL: &str = "phy";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RiskDocument {
    pub futures_portfolios: Vec<FuturesPortfolio>,
    pub option_portfolios: Vec<OptionPortfolio>,
    /// First `phy/p` in document order, if any.
    pub underlying_reference: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuturesPortfolio {
    pub symbol: String,
    pub contracts: Vec<FuturesContract>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuturesContract {
    pub expiry: ExpiryKey,
    pub price: Decimal,
    pub scenarios: Vec<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionPortfolio {
    pub symbol: String,
    pub series: Vec<OptionSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionSeries {
    pub expiry: ExpiryKey,
    pub options: Vec<OptionContract>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionContract {
    pub option_type: OptionType,
    pub strike: Decimal,
    pub premium: Decimal,
    pub scenarios: Vec<Decimal>,
}

impl RiskDocument {
    pub fn parse_str(xml: &str) -> Result<Self, SpanError> {
        Self::parse_reader(xml.as_bytes())
    }

    pub fn parse_reader<R: BufRead>(source: R) -> Result<Self, SpanError> {
        let root = read_tree(source)?;
        let mut document = RiskDocument::default();
        collect(&root, &mut document)?;
        debug!(
            futures_portfolios = document.futures_portfolios.len(),
            option_portfolios = document.option_portfolios.len(),
            "risk document parsed"
        );
        Ok(document)
    }

    /// Opens, parses and closes the file. The handle does not outlive this call.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SpanError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SpanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_reader(BufReader::new(file))
    }
}

// 2.1: generic element tree. attributes are ignored, the exchange file doesn't use them.
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Self::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn required(&self, name: &str, context: &str) -> Result<&Element, SpanError> {
        self.child(name)
            .ok_or_else(|| SpanError::malformed(format!("{context}: missing <{name}>")))
    }

    fn required_text(&self, name: &str, context: &str) -> Result<&str, SpanError> {
        let text = self.required(name, context)?.text.trim();
        if text.is_empty() {
            return Err(SpanError::malformed(format!("{context}: empty <{name}>")));
        }
        Ok(text)
    }

    fn required_decimal(&self, name: &str, context: &str) -> Result<Decimal, SpanError> {
        let text = self.required_text(name, context)?;
        parse_decimal(text).ok_or_else(|| {
            SpanError::malformed(format!("{context}: <{name}> is not a number: {text:?}"))
        })
    }

    fn required_expiry(&self, context: &str) -> Result<ExpiryKey, SpanError> {
        let text = self.required_text("pe", context)?;
        ExpiryKey::parse(text).ok_or_else(|| {
            SpanError::malformed(format!("{context}: <pe> is not a YYYYMMDD date: {text:?}"))
        })
    }

    fn scenarios(&self, context: &str) -> Result<Vec<Decimal>, SpanError> {
        let array = self.required("ra", context)?;
        let values = array
            .children_named("a")
            .enumerate()
            .map(|(i, a)| {
                parse_decimal(&a.text).ok_or_else(|| {
                    SpanError::malformed(format!(
                        "{context}: scenario {} is not a number: {:?}",
                        i + 1,
                        a.text
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if values.is_empty() {
            return Err(SpanError::malformed(format!("{context}: <ra> has no <a> values")));
        }
        Ok(values)
    }
}

fn read_tree<R: BufRead>(source: R) -> Result<Element, SpanError> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack = vec![Element::named(b"#document")];

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|err| {
            SpanError::malformed(format!(
                "XML error at byte {}: {err}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(start) => stack.push(Element::named(start.local_name().as_ref())),
            Event::Empty(start) => {
                let element = Element::named(start.local_name().as_ref());
                attach(&mut stack, element);
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(SpanError::malformed("unbalanced closing tag"));
                }
                if let Some(element) = stack.pop() {
                    attach(&mut stack, element);
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|err| SpanError::malformed(format!("bad text content: {err}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if stack.len() != 1 {
        let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
        return Err(SpanError::malformed(format!("unexpected end of file inside <{open}>")));
    }
    stack
        .pop()
        .ok_or_else(|| SpanError::malformed("empty document"))
}

fn attach(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}

// 2.2: walk the tree. portfolios are leaves of the walk, everything else is descended into.
fn collect(element: &Element, document: &mut RiskDocument) -> Result<(), SpanError> {
    match element.name.as_str() {
        FUTURES_PORTFOLIO => {
            let portfolio = futures_portfolio(element, document.futures_portfolios.len())?;
            document.futures_portfolios.push(portfolio);
        }
        OPTION_PORTFOLIO => {
            let portfolio = option_portfolio(element, document.option_portfolios.len())?;
            document.option_portfolios.push(portfolio);
        }
        PHYSICAL => {
            if document.underlying_reference.is_some() {
                warn!("additional <phy> node ignored, first one in document order is used");
            } else {
                document.underlying_reference = Some(element.required_decimal("p", "phy")?);
            }
        }
        _ => {
            for child in &element.children {
                collect(child, document)?;
            }
        }
    }
    Ok(())
}

fn futures_portfolio(element: &Element, position: usize) -> Result<FuturesPortfolio, SpanError> {
    let symbol = element
        .required_text("name", &format!("futPf #{}", position + 1))?
        .to_string();

    let contracts = element
        .children_named("fut")
        .enumerate()
        .map(|(i, fut)| -> Result<FuturesContract, SpanError> {
            let context = format!("futPf[{symbol}]/fut #{}", i + 1);
            Ok(FuturesContract {
                expiry: fut.required_expiry(&context)?,
                price: fut.required_decimal("p", &context)?,
                scenarios: fut.scenarios(&context)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FuturesPortfolio { symbol, contracts })
}

fn option_portfolio(element: &Element, position: usize) -> Result<OptionPortfolio, SpanError> {
    let symbol = element
        .required_text("name", &format!("oopPf #{}", position + 1))?
        .to_string();

    let mut series = Vec::new();
    for (i, node) in element.children_named("series").enumerate() {
        let context = format!("oopPf[{symbol}]/series #{}", i + 1);
        let expiry = node.required_expiry(&context)?;

        let options = node
            .children_named("opt")
            .enumerate()
            .map(|(j, opt)| {
                let context = format!("oopPf[{symbol}]/series[{expiry}]/opt #{}", j + 1);
                option_contract(opt, &context)
            })
            .collect::<Result<Vec<_>, _>>()?;

        series.push(OptionSeries { expiry, options });
    }

    Ok(OptionPortfolio { symbol, series })
}

fn option_contract(opt: &Element, context: &str) -> Result<OptionContract, SpanError> {
    let code = opt.required_text("o", context)?;
    let option_type = OptionType::from_code(code).ok_or_else(|| {
        SpanError::malformed(format!("{context}: unknown option type {code:?}"))
    })?;

    Ok(OptionContract {
        option_type,
        strike: opt.required_decimal("k", context)?,
        premium: opt.required_decimal("p", context)?,
        scenarios: opt.scenarios(context)?,
    })
}
