//! Prompt composition
//!
//! The question and every piece of gathered context are inserted verbatim.
//! Nothing is escaped, so a question can steer the model (accepted
//! prompt-injection surface).

/// Fixed background on the Lei do Bem
pub const BASE_CONTEXT: &str = "A Lei do Bem (Lei nº 11.196/2005) oferece incentivos fiscais para empresas que realizam atividades de pesquisa e desenvolvimento (P&D) de inovação tecnológica no Brasil. Os principais objetivos são:

- Estimular a inovação tecnológica nas empresas.
- Incentivar o investimento privado em P&D.
- Tornar o país mais competitivo tecnologicamente.

Principais benefícios:

- Dedução de 20,4% a 34% do IRPJ e CSLL sobre gastos com P&D.
- Redução de 50% do IPI na compra de máquinas e equipamentos.
- Depreciação e amortização acelerada de bens utilizados em P&D.
- Isenção de IR na remessa ao exterior para registro de patentes.

As empresas devem estar em lucro real e cumprir os critérios legais para obter os incentivos.";

/// Repository section when the caller gave no URL
pub const NO_REPOSITORY: &str = "Nenhum repositório fornecido.";

/// Merge the knowledge block, graph context, repository evidence and question
pub fn compose(base: &str, graph_context: &str, repo_context: &str, question: &str) -> String {
    format!(
        "Você é um especialista na Lei do Bem (Lei nº 11.196/2005). Responda com clareza e base legal à pergunta abaixo, usando o contexto fornecido.

Contexto Fixo:
{base}

Contexto Dinâmico do Grafo:
{graph_context}

Evidências do Repositório:
{repo_context}

Pergunta:
{question}

Resposta:
"
    )
}
