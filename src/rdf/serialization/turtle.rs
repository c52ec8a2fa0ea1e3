//! Turtle-family formats (Turtle, N-Triples, N-Quads, TriG) via rio

use super::{ParseError, ParseResult, RdfFormat, SerializeError, SerializeResult};
use crate::rdf::{
    BlankNode, Literal, NamedNode, Quad, QuadStore, RdfGraph, RdfObject, RdfPredicate, RdfSubject,
};
use crate::rdf::namespace::xsd;
use rio_api::formatter::{QuadsFormatter, TriplesFormatter};
use rio_api::model as rio;
use rio_api::parser::{QuadsParser, TriplesParser};
use rio_turtle::{
    NQuadsFormatter, NQuadsParser, NTriplesFormatter, NTriplesParser, TriGFormatter, TriGParser,
    TurtleError, TurtleFormatter, TurtleParser,
};

impl From<TurtleError> for ParseError {
    fn from(e: TurtleError) -> Self {
        ParseError::Parse(e.to_string())
    }
}

/// Parse `input`; statements without a graph go to `graph`
pub(super) fn parse(input: &[u8], format: RdfFormat, graph: &RdfGraph) -> ParseResult<Vec<Quad>> {
    let mut quads = Vec::new();
    match format {
        RdfFormat::Turtle => {
            let mut parser = TurtleParser::new(input, None);
            parse_triples(&mut parser, graph, &mut quads)?;
        }
        RdfFormat::NTriples => {
            let mut parser = NTriplesParser::new(input);
            parse_triples(&mut parser, graph, &mut quads)?;
        }
        RdfFormat::NQuads => {
            let mut parser = NQuadsParser::new(input);
            parse_quads(&mut parser, graph, &mut quads)?;
        }
        RdfFormat::TriG => {
            let mut parser = TriGParser::new(input, None);
            parse_quads(&mut parser, graph, &mut quads)?;
        }
    }
    Ok(quads)
}

fn parse_triples<P>(parser: &mut P, graph: &RdfGraph, quads: &mut Vec<Quad>) -> ParseResult<()>
where
    P: TriplesParser,
    ParseError: From<P::Error>,
{
    parser.parse_all(&mut |t: rio::Triple<'_>| -> ParseResult<()> {
        quads.push(Quad::new(
            convert_subject(t.subject)?,
            convert_predicate(t.predicate)?,
            convert_object(t.object)?,
            graph.clone(),
        ));
        Ok(())
    })
}

fn parse_quads<P>(parser: &mut P, default_graph: &RdfGraph, quads: &mut Vec<Quad>) -> ParseResult<()>
where
    P: QuadsParser,
    ParseError: From<P::Error>,
{
    parser.parse_all(&mut |q: rio::Quad<'_>| -> ParseResult<()> {
        let graph = match q.graph_name {
            Some(rio::GraphName::NamedNode(n)) => RdfGraph::NamedNode(named_node(n.iri)?),
            Some(rio::GraphName::BlankNode(b)) => RdfGraph::BlankNode(blank_node(b.id)?),
            None => default_graph.clone(),
        };
        quads.push(Quad::new(
            convert_subject(q.subject)?,
            convert_predicate(q.predicate)?,
            convert_object(q.object)?,
            graph,
        ));
        Ok(())
    })
}

/// Serialize every quad of `store`; callers check graph support beforehand
pub(super) fn serialize(store: &QuadStore, format: RdfFormat) -> SerializeResult<String> {
    let mut output = Vec::new();
    match format {
        RdfFormat::Turtle => {
            let mut formatter = TurtleFormatter::new(&mut output);
            for quad in store {
                formatter
                    .format(&rio_triple(quad))
                    .map_err(|e| SerializeError::Serialize(e.to_string()))?;
            }
            formatter
                .finish()
                .map_err(|e| SerializeError::Serialize(e.to_string()))?;
        }
        RdfFormat::NTriples => {
            let mut formatter = NTriplesFormatter::new(&mut output);
            for quad in store {
                formatter
                    .format(&rio_triple(quad))
                    .map_err(|e| SerializeError::Serialize(e.to_string()))?;
            }
            formatter
                .finish()
                .map_err(|e| SerializeError::Serialize(e.to_string()))?;
        }
        RdfFormat::NQuads => {
            let mut formatter = NQuadsFormatter::new(&mut output);
            for quad in store {
                formatter
                    .format(&rio_quad(quad))
                    .map_err(|e| SerializeError::Serialize(e.to_string()))?;
            }
            formatter
                .finish()
                .map_err(|e| SerializeError::Serialize(e.to_string()))?;
        }
        RdfFormat::TriG => {
            let mut formatter = TriGFormatter::new(&mut output);
            for quad in store {
                formatter
                    .format(&rio_quad(quad))
                    .map_err(|e| SerializeError::Serialize(e.to_string()))?;
            }
            formatter
                .finish()
                .map_err(|e| SerializeError::Serialize(e.to_string()))?;
        }
    }

    String::from_utf8(output).map_err(|e| SerializeError::Serialize(e.to_string()))
}

fn rio_subject(subject: &RdfSubject) -> rio::Subject<'_> {
    match subject {
        RdfSubject::NamedNode(n) => rio::NamedNode { iri: n.as_str() }.into(),
        RdfSubject::BlankNode(b) => rio::BlankNode { id: b.as_str() }.into(),
    }
}

fn rio_object(object: &RdfObject) -> rio::Term<'_> {
    match object {
        RdfObject::NamedNode(n) => rio::NamedNode { iri: n.as_str() }.into(),
        RdfObject::BlankNode(b) => rio::BlankNode { id: b.as_str() }.into(),
        RdfObject::Literal(l) => {
            let literal = if let Some(language) = l.language() {
                rio::Literal::LanguageTaggedString {
                    value: l.value(),
                    language,
                }
            } else if l.datatype_iri() == xsd::STRING.as_str() {
                rio::Literal::Simple { value: l.value() }
            } else {
                rio::Literal::Typed {
                    value: l.value(),
                    datatype: rio::NamedNode {
                        iri: l.datatype_iri(),
                    },
                }
            };
            literal.into()
        }
    }
}

fn rio_triple(quad: &Quad) -> rio::Triple<'_> {
    rio::Triple {
        subject: rio_subject(&quad.subject),
        predicate: rio::NamedNode {
            iri: quad.predicate.as_str(),
        },
        object: rio_object(&quad.object),
    }
}

fn rio_quad(quad: &Quad) -> rio::Quad<'_> {
    let graph_name = match &quad.graph {
        RdfGraph::NamedNode(n) => Some(rio::NamedNode { iri: n.as_str() }.into()),
        RdfGraph::BlankNode(b) => Some(rio::BlankNode { id: b.as_str() }.into()),
        RdfGraph::DefaultGraph => None,
    };
    rio::Quad {
        subject: rio_subject(&quad.subject),
        predicate: rio::NamedNode {
            iri: quad.predicate.as_str(),
        },
        object: rio_object(&quad.object),
        graph_name,
    }
}

fn named_node(iri: &str) -> ParseResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| ParseError::Parse(e.to_string()))
}

fn blank_node(id: &str) -> ParseResult<BlankNode> {
    BlankNode::from_id(id).map_err(|e| ParseError::Parse(e.to_string()))
}

fn convert_subject(s: rio::Subject<'_>) -> ParseResult<RdfSubject> {
    match s {
        rio::Subject::NamedNode(n) => Ok(named_node(n.iri)?.into()),
        rio::Subject::BlankNode(b) => Ok(blank_node(b.id)?.into()),
        #[allow(unreachable_patterns)]
        _ => Err(ParseError::Parse("Unsupported subject type".to_string())),
    }
}

fn convert_predicate(p: rio::NamedNode<'_>) -> ParseResult<RdfPredicate> {
    Ok(named_node(p.iri)?.into())
}

fn convert_object(o: rio::Term<'_>) -> ParseResult<RdfObject> {
    match o {
        rio::Term::NamedNode(n) => Ok(named_node(n.iri)?.into()),
        rio::Term::BlankNode(b) => Ok(blank_node(b.id)?.into()),
        rio::Term::Literal(l) => match l {
            rio::Literal::Simple { value } => Ok(Literal::new_simple_literal(value).into()),
            rio::Literal::LanguageTaggedString { value, language } => {
                Ok(Literal::new_language_tagged_literal(value, language)
                    .map_err(|e| ParseError::Parse(e.to_string()))?
                    .into())
            }
            rio::Literal::Typed { value, datatype } => {
                Ok(Literal::new_typed_literal(value, named_node(datatype.iri)?).into())
            }
        },
        #[allow(unreachable_patterns)]
        _ => Err(ParseError::Parse("Unsupported object type".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TURTLE: &str = r#"
        @prefix foaf: <http://xmlns.com/foaf/0.1/> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        <http://example.org/alice> foaf:name "Alice" ;
            foaf:age "30"^^xsd:integer ;
            foaf:nick "Ali"@en ;
            foaf:knows [ foaf:name "Bob" ] .
    "#;

    #[test]
    fn test_turtle_roundtrip() {
        let quads = parse(TURTLE.as_bytes(), RdfFormat::Turtle, &RdfGraph::DefaultGraph).unwrap();
        assert_eq!(quads.len(), 5);

        let store = QuadStore::from_quads(quads);
        let output = serialize(&store, RdfFormat::Turtle).unwrap();
        let reparsed = parse(output.as_bytes(), RdfFormat::Turtle, &RdfGraph::DefaultGraph).unwrap();
        assert_eq!(reparsed.len(), 5);
        assert!(output.contains("http://example.org/alice"));
    }

    #[test]
    fn test_triples_go_to_requested_graph() {
        let graph = RdfGraph::from(NamedNode::new("http://example.org/doc").unwrap());
        let quads = parse(TURTLE.as_bytes(), RdfFormat::Turtle, &graph).unwrap();
        assert!(quads.iter().all(|q| q.graph == graph));
    }

    #[test]
    fn test_nquads_keep_their_graphs() {
        let input = "<http://example.org/a> <http://example.org/p> \"x\" <http://example.org/g> .\n\
                     <http://example.org/a> <http://example.org/p> \"y\" .\n";
        let quads = parse(input.as_bytes(), RdfFormat::NQuads, &RdfGraph::DefaultGraph).unwrap();
        assert_eq!(quads.len(), 2);
        assert!(!quads[0].graph.is_default_graph());
        assert!(quads[1].graph.is_default_graph());

        let output = serialize(&QuadStore::from_quads(quads), RdfFormat::NQuads).unwrap();
        assert!(output.contains("<http://example.org/g>"));
    }

    #[test]
    fn test_ntriples_output_is_complete() {
        let quads = parse(TURTLE.as_bytes(), RdfFormat::Turtle, &RdfGraph::DefaultGraph).unwrap();
        let output = serialize(&QuadStore::from_quads(quads), RdfFormat::NTriples).unwrap();
        assert_eq!(output.lines().count(), 5);
        assert!(output.lines().all(|line| line.trim_end().ends_with('.')));

        let reparsed = parse(output.as_bytes(), RdfFormat::NTriples, &RdfGraph::DefaultGraph).unwrap();
        assert_eq!(reparsed.len(), 5);
    }

    #[test]
    fn test_parse_error() {
        let result = parse(b"<http://example.org/a> <broken", RdfFormat::Turtle, &RdfGraph::DefaultGraph);
        assert!(matches!(result, Err(ParseError::Parse(_))));
    }
}
