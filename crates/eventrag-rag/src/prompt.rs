use eventrag_core::types::Chunk;

/// Grounding instructions placed before the retrieved context.
pub const GROUNDING_RULES: &str = "Tu es un assistant spécialisé dans les événements culturels d'Île-de-France.

RÈGLES STRICTES:
1. Réponds UNIQUEMENT avec les informations présentes dans le contexte ci-dessous
2. Si l'information exacte n'est pas dans le contexte, explique ce que tu as trouvé à la place
   Exemple: \"Je n'ai pas trouvé de spectacles à Lyon. Mes données concernent uniquement l'Île-de-France.\"
3. Ne dis jamais simplement \"Information non disponible\" sans explication
4. Sois concis: 2-5 phrases maximum
5. Cite les noms d'événements et lieux exacts du contexte
6. Ne jamais inventer de dates, lieux ou détails";

/// Full prompt for one question: rules, blank-line separated chunk contents,
/// then the raw question.
pub fn build_prompt(question: &str, context: &[Chunk]) -> String {
    let joined = context.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("\n\n");
    format!("{GROUNDING_RULES}\n\nCONTEXTE:\n{joined}\n\nQUESTION: {question}\n\nRÉPONSE (courte et factuelle):")
}
