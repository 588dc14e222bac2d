use crate::job::types::RequestParameters;

/// Build the labeled research task sent to the execution service.
///
/// The structure (analysis type, framework, free-text context, the four
/// research parameters, and the upload instruction) is what the remote
/// interaction expects; the document it produces is what the polling loop
/// later detects in the library.
pub fn build_research_prompt(parameters: &RequestParameters) -> String {
    format!(
        "Utilize Web Search to develop a comprehensive report utilizing the following \
structure as a guide to provide users a complete and well informed research document:
Analysis Type: {capability}
Framework: {framework}

Utilize this context to gain additional insight into your research topic:
{context}

The Research Parameters you must follow for this document are:
- Scope: {scope}
- Depth: {depth}
- Rigor: {rigor}
- Perspective: {perspective}

Search for the most recent data unless otherwise specified. Always capture the most \
recent reliable data. The final output must be a document uploaded to the content \
object library.",
        capability = parameters.capability,
        framework = parameters.framework,
        context = parameters.context,
        scope = parameters.modifiers.scope,
        depth = parameters.modifiers.depth,
        rigor = parameters.modifiers.rigor,
        perspective = parameters.modifiers.perspective,
    )
}
