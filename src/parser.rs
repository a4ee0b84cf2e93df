use anyhow::{bail, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::one_of,
    combinator::{opt, rest},
    sequence::{preceded, terminated},
    IResult,
};

const EXPECTED_FORMS: &str =
    "expected an id of letters, digits, '-' or '_', or a URL ending in /resume/<id>";

/// Parses a resume reference given on the command line into a resume id
///
/// Either the bare id ("1a2b3c") or the resume's public page URL
/// ("https://hh.ru/resume/1a2b3c?hhtmFrom=resume_list") is accepted.
pub fn parse_resume_ref(input: &str) -> Result<String> {
    match alt((resume_url, resume_id))(input.trim()) {
        Ok((remainder, id)) => {
            if remainder.is_empty() {
                Ok(id.to_string())
            } else {
                bail!("Invalid resume reference: {} ({})", input, EXPECTED_FORMS)
            }
        }

        Err(_) => {
            bail!("Invalid resume reference: {} ({})", input, EXPECTED_FORMS)
        }
    }
}

fn resume_url(input: &str) -> IResult<&str, &str> {
    let (input, _) = take_until("/resume/")(input)?;
    let (input, id) = preceded(tag("/resume/"), terminated(resume_id, opt(tag("/"))))(input)?;
    let (input, _) = opt(preceded(one_of("?#"), rest))(input)?;

    Ok((input, id))
}

fn resume_id(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(input)
}
